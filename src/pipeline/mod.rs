//! Pipeline stages for LaTeX → PDF/DOCX conversion.
//!
//! Each submodule implements exactly one concern of a conversion job.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ tools ──▶ runner ──▶ diagnostics
//! (text/file) (argv)   (spawn+wait) (error line)
//! ```
//!
//! 1. [`source`]      — turn pasted text or a `.tex` file into a [`source::SourceDocument`]
//!    with a safe file name
//! 2. [`tools`]       — build the fixed argument lists for the compiler and converter
//! 3. [`runner`]      — execute one invocation with captured output and a timeout;
//!    the only stage that spawns processes
//! 4. [`diagnostics`] — pull the first LaTeX error out of the compiler output

pub mod diagnostics;
pub mod runner;
pub mod source;
pub mod tools;
