//! Print the tool catalog

use gotas_mcp::{payment_catalog, ToolCatalog};

use crate::error::CliResult;
use crate::utils::{truncate_text, ColoredOutput};

pub struct ToolsCommand;

impl ToolsCommand {
    pub fn run(json: bool) -> CliResult<()> {
        let catalog = payment_catalog();
        if json {
            let payload = serde_json::json!({ "tools": catalog.descriptors() });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            Self::display_table(&catalog);
        }
        Ok(())
    }

    fn display_table(catalog: &ToolCatalog) {
        println!(
            "{}",
            ColoredOutput::success(&format!("{} tool(s) available:", catalog.len()))
        );
        println!();

        println!(
            "{:<24} {:<48} {:<30}",
            ColoredOutput::highlight("Name"),
            ColoredOutput::highlight("Description"),
            ColoredOutput::highlight("Parameters")
        );
        println!("{}", "-".repeat(100));

        for tool in catalog.list() {
            let params = tool
                .params()
                .iter()
                .map(|p| {
                    if p.required {
                        format!("{}*", p.name)
                    } else {
                        p.name.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{:<24} {:<48} {:<30}",
                tool.name(),
                truncate_text(tool.description(), 48),
                params
            );
        }

        println!();
        println!("{}", ColoredOutput::dim("* required"));
        println!(
            "{}",
            ColoredOutput::info("Invoking a tool requires GOTAS_API_KEY; listing does not.")
        );
    }
}
