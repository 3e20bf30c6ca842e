use sbeprims_ir::IrRegistry;
use sbeprims_otf::{decode_with_registry, JsonVisitor, OtfConfig, OtfDecoder};
use serde_json::Value;
use tracing::debug;

use crate::cmd::{load_ir, DecodeArgs};
use crate::exit::{io_error, ir_error, otf_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{flatten, print_json, print_table, OutputFormat};

enum Schemas {
    One(sbeprims_ir::Ir),
    Registry(IrRegistry),
}

impl Schemas {
    fn decode(&self, buf: &[u8], offset: usize, visitor: &mut JsonVisitor) -> CliResult<usize> {
        let result = match self {
            Schemas::One(ir) => OtfDecoder::new(ir).decode(buf, offset, visitor),
            Schemas::Registry(registry) => {
                decode_with_registry(registry, buf, offset, OtfConfig::default(), visitor)
            }
        };
        result.map_err(|err| otf_error(&format!("decode at offset {offset}"), err))
    }
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let schemas = if args.ir.is_dir() {
        let registry = IrRegistry::from_directory(&args.ir)
            .map_err(|err| ir_error(&format!("load {}", args.ir.display()), err))?;
        Schemas::Registry(registry)
    } else {
        Schemas::One(load_ir(&args.ir)?)
    };
    let buf = std::fs::read(&args.input)
        .map_err(|err| io_error(&format!("read {}", args.input.display()), err))?;

    let mut visitor = JsonVisitor::new();
    let mut offset = args.offset;
    let mut messages = Vec::new();
    loop {
        let consumed = schemas.decode(&buf, offset, &mut visitor)?;
        let mut doc = visitor
            .take()
            .ok_or_else(|| CliError::new(INTERNAL, "decoder produced no message"))?;
        if let Value::Object(map) = &mut doc {
            map.insert("offset".to_string(), Value::from(offset));
            map.insert("length".to_string(), Value::from(consumed));
        }
        messages.push(doc);
        offset += consumed;
        if !args.all || offset >= buf.len() {
            break;
        }
    }
    debug!(messages = messages.len(), bytes = offset - args.offset, "decoded input");

    match format {
        OutputFormat::Table => {
            for doc in &messages {
                println!(
                    "{} (template {}, offset {}, {} bytes)",
                    doc["message"].as_str().unwrap_or_default(),
                    doc["templateId"],
                    doc["offset"],
                    doc["length"]
                );
                let mut rows = Vec::new();
                flatten("", &doc["body"], &mut rows);
                print_table(&["FIELD", "VALUE"], rows);
            }
        }
        _ if args.all => print_json(&messages, format),
        _ => {
            if let Some(doc) = messages.first() {
                print_json(doc, format);
            }
        }
    }
    Ok(SUCCESS)
}
