use serde::Serialize;
use sbeprims_codec::{encode_message, encoded_size};
use sbeprims_otf::message_from_json;
use serde_json::Value;
use tracing::debug;

use crate::cmd::{load_ir, EncodeArgs};
use crate::exit::{
    codec_error, io_error, otf_error, CliError, CliResult, DATA_INVALID, NOT_FOUND, SUCCESS,
};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncodeOutput {
    message: String,
    template_id: u16,
    acting_version: u16,
    bytes: usize,
    output: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let ir = load_ir(&args.ir)?;
    let message = ir.message_by_id(args.template).ok_or_else(|| {
        CliError::new(NOT_FOUND, format!("no message with template id {}", args.template))
    })?;
    let acting_version = args.acting_version.unwrap_or(ir.version());

    let text = match (&args.json, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read {}", path.display()), err))?,
        (None, None) => String::new(),
    };
    let json: Value = serde_json::from_str(&text)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid JSON value: {err}")))?;
    let value = message_from_json(message, &json).map_err(|err| otf_error("encode", err))?;

    let size = encoded_size(&ir, args.template, &value, acting_version)
        .map_err(|err| codec_error("encode", err))?;
    let mut buf = vec![0u8; size];
    let written = encode_message(&ir, args.template, &value, &mut buf, 0, acting_version)
        .map_err(|err| codec_error("encode", err))?;
    buf.truncate(written);
    std::fs::write(&args.output, &buf)
        .map_err(|err| io_error(&format!("write {}", args.output.display()), err))?;
    debug!(message = %message.name, bytes = written, acting_version, "encoded message");

    let out = EncodeOutput {
        message: message.name.clone(),
        template_id: message.id,
        acting_version,
        bytes: written,
        output: args.output.display().to_string(),
    };
    match format {
        OutputFormat::Table => print_table(
            &["MESSAGE", "TEMPLATE", "VERSION", "BYTES", "OUTPUT"],
            vec![vec![
                out.message,
                out.template_id.to_string(),
                out.acting_version.to_string(),
                out.bytes.to_string(),
                out.output,
            ]],
        ),
        _ => print_json(&out, format),
    }
    Ok(SUCCESS)
}
