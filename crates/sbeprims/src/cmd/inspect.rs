use sbeprims_ir::{Block, Encoding, Ir, Message};
use serde_json::json;

use crate::cmd::{load_ir, InspectArgs};
use crate::exit::{CliError, CliResult, NOT_FOUND, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let ir = load_ir(&args.ir)?;
    let messages = match &args.message {
        Some(wanted) => vec![find_message(&ir, wanted)?],
        None => ir.messages().iter().collect(),
    };

    match format {
        OutputFormat::Table => {
            println!(
                "{} (schema {} v{}, {}, header {} bytes)",
                ir.package(),
                ir.schema_id(),
                ir.version(),
                ir.byte_order(),
                ir.header().size()
            );
            for message in messages {
                println!();
                println!(
                    "{} (template {}, block length {}, since v{})",
                    message.name,
                    message.id,
                    message.block_length(),
                    message.since_version
                );
                let mut rows = Vec::new();
                layout_rows("", &message.block, &mut rows);
                print_table(
                    &["NAME", "KIND", "TYPE", "OFFSET", "SIZE", "SINCE", "PRESENCE"],
                    rows,
                );
            }
        }
        _ => {
            let out = json!({
                "package": ir.package(),
                "schemaId": ir.schema_id(),
                "version": ir.version(),
                "semanticVersion": ir.semantic_version(),
                "byteOrder": ir.byte_order(),
                "header": ir.header(),
                "messages": messages,
            });
            print_json(&out, format);
        }
    }
    Ok(SUCCESS)
}

fn find_message<'a>(ir: &'a Ir, wanted: &str) -> CliResult<&'a Message> {
    let by_id = wanted.parse::<u16>().ok().and_then(|id| ir.message_by_id(id));
    by_id
        .or_else(|| ir.message_by_name(wanted))
        .ok_or_else(|| CliError::new(NOT_FOUND, format!("no message '{wanted}' in schema")))
}

/// One row per field, group and var-data section, nested names dotted.
fn layout_rows(prefix: &str, block: &Block, rows: &mut Vec<Vec<String>>) {
    for field in &block.fields {
        let ty = match &field.encoding {
            Encoding::Primitive(t) if t.length > 1 => format!("{}[{}]", t.primitive, t.length),
            other => other.name().to_string(),
        };
        rows.push(vec![
            format!("{prefix}{}", field.name),
            "field".to_string(),
            ty,
            field.offset.to_string(),
            field.size().to_string(),
            field.since_version.to_string(),
            format!("{:?}", field.presence).to_lowercase(),
        ]);
    }
    for group in &block.groups {
        let name = format!("{prefix}{}", group.name);
        rows.push(vec![
            name.clone(),
            "group".to_string(),
            format!("block {}", group.block.block_length),
            String::new(),
            format!("{}+", group.dimension.size()),
            group.since_version.to_string(),
            String::new(),
        ]);
        layout_rows(&format!("{name}."), &group.block, rows);
    }
    for data in &block.data {
        rows.push(vec![
            format!("{prefix}{}", data.name),
            "data".to_string(),
            format!("{} prefix", data.length_type),
            String::new(),
            format!("{}+", data.length_type.size()),
            data.since_version.to_string(),
            String::new(),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use sbeprims_ir::{SchemaBuilder, SchemaDef};

    use super::*;

    fn ir() -> Ir {
        SchemaBuilder::default()
            .build(
                &SchemaDef::from_json(
                    r#"{ "package": "i", "id": 1, "version": 0,
                    "messages": [{ "name": "M", "id": 5,
                        "fields": [{ "name": "a", "type": "uint16" }],
                        "groups": [{ "name": "g", "fields": [{ "name": "b", "type": "int8" }] }],
                        "data": [{ "name": "d", "lengthType": "uint8" }] }]
                }"#,
                )
                .unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn rows_cover_nested_layout() {
        let ir = ir();
        let mut rows = Vec::new();
        layout_rows("", &ir.messages()[0].block, &mut rows);
        let names: Vec<_> = rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, ["a", "g", "g.b", "d"]);
        assert_eq!(rows[0][4], "2");
        assert_eq!(rows[3][4], "1+");
    }

    #[test]
    fn messages_by_name_or_id() {
        let ir = ir();
        assert_eq!(find_message(&ir, "5").unwrap().name, "M");
        assert_eq!(find_message(&ir, "M").unwrap().id, 5);
        assert_eq!(find_message(&ir, "9").unwrap_err().code, NOT_FOUND);
    }
}
