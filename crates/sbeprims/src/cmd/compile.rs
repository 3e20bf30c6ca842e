use serde::Serialize;
use sbeprims_ir::{write_ir_file, BuilderConfig};
use tracing::info;

use crate::cmd::{build_definition, CompileArgs};
use crate::exit::{ir_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileOutput {
    package: String,
    schema_id: u16,
    version: u16,
    messages: usize,
    types: usize,
    output: String,
}

pub fn run(args: CompileArgs, format: OutputFormat) -> CliResult<i32> {
    let defaults = BuilderConfig::default();
    let config = BuilderConfig {
        max_depth: args.max_depth.unwrap_or(defaults.max_depth),
        reject_deprecated: args.reject_deprecated,
    };
    let ir = build_definition(&args.definition, config)?;
    write_ir_file(&args.output, &ir)
        .map_err(|err| ir_error(&format!("write {}", args.output.display()), err))?;
    info!(
        schema_id = ir.schema_id(),
        output = %args.output.display(),
        "compiled schema IR"
    );

    let out = CompileOutput {
        package: ir.package().to_string(),
        schema_id: ir.schema_id(),
        version: ir.version(),
        messages: ir.messages().len(),
        types: ir.types().len(),
        output: args.output.display().to_string(),
    };
    match format {
        OutputFormat::Table => print_table(
            &["PACKAGE", "SCHEMA ID", "VERSION", "MESSAGES", "TYPES", "OUTPUT"],
            vec![vec![
                out.package,
                out.schema_id.to_string(),
                out.version.to_string(),
                out.messages.to_string(),
                out.types.to_string(),
                out.output,
            ]],
        ),
        _ => print_json(&out, format),
    }
    Ok(SUCCESS)
}
