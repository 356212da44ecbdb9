//! Fixed argument lists for the two external tools.
//!
//! ```text
//! pdflatex <pdf_flags…> -output-directory=<workdir> <name>.tex
//! pandoc   <name>.tex --to docx -o <name>.docx --resource-path=<dirs> <docx_args…>
//! ```
//!
//! Both run with the job's working directory as cwd and receive only the
//! bare source file name, so no user-controlled path ever lands in argv.

use crate::config::ConverterConfig;
use crate::output::ToolKind;
use crate::pipeline::runner::ToolInvocation;
use crate::pipeline::source::SourceDocument;
use std::ffi::OsString;
use std::path::Path;

/// Build the PDF compiler invocation for `source` inside `working_dir`.
///
/// When the source came from disk its directory is added to `TEXINPUTS` so
/// relative `\input`, `\include` and `\includegraphics` keep resolving.
pub fn pdf_invocation(
    config: &ConverterConfig,
    source: &SourceDocument,
    working_dir: &Path,
) -> ToolInvocation {
    let mut args: Vec<OsString> = config.pdf_flags.iter().map(OsString::from).collect();
    let mut output_dir_flag = OsString::from("-output-directory=");
    output_dir_flag.push(working_dir.as_os_str());
    args.push(output_dir_flag);
    args.push(OsString::from(source.file_name()));

    let env = source
        .origin_dir()
        .map(|dir| vec![(OsString::from("TEXINPUTS"), texinputs_with(dir))])
        .unwrap_or_default();

    ToolInvocation {
        tool: ToolKind::PdfCompiler,
        program: config.pdf_compiler.clone(),
        args,
        working_dir: working_dir.to_path_buf(),
        env,
        timeout: config.timeout(),
        expected_output: working_dir.join(artifact_name(source, ToolKind::PdfCompiler)),
    }
}

/// Build the DOCX converter invocation for `source` inside `working_dir`.
pub fn docx_invocation(
    config: &ConverterConfig,
    source: &SourceDocument,
    working_dir: &Path,
) -> ToolInvocation {
    let output_name = artifact_name(source, ToolKind::DocxConverter);

    let mut args: Vec<OsString> = vec![
        OsString::from(source.file_name()),
        OsString::from("--to"),
        OsString::from("docx"),
        OsString::from("-o"),
        OsString::from(&output_name),
    ];
    if let Some(dir) = source.origin_dir() {
        let mut flag = OsString::from("--resource-path=.");
        flag.push(path_list_separator());
        flag.push(dir.as_os_str());
        args.push(flag);
    }
    args.extend(config.docx_args.iter().map(OsString::from));

    ToolInvocation {
        tool: ToolKind::DocxConverter,
        program: config.docx_converter.clone(),
        args,
        working_dir: working_dir.to_path_buf(),
        env: Vec::new(),
        timeout: config.timeout(),
        expected_output: working_dir.join(output_name),
    }
}

/// `<name>.pdf` or `<name>.docx`.
pub fn artifact_name(source: &SourceDocument, tool: ToolKind) -> String {
    format!("{}.{}", source.name(), tool.artifact_extension())
}

/// `.<sep><dir><sep><existing TEXINPUTS>`; the trailing separator keeps the
/// TeX distribution's default search path.
fn texinputs_with(dir: &Path) -> OsString {
    let sep = path_list_separator();
    let mut value = OsString::from(".");
    value.push(sep);
    value.push(dir.as_os_str());
    value.push(sep);
    if let Some(existing) = std::env::var_os("TEXINPUTS") {
        value.push(existing);
    }
    value
}

fn path_list_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}
