//! KUDE Report Generation
//!
//! Glue around the external report tool that renders electronic invoice
//! XML into PDF.
//!
//! ## Flow
//!
//! 1. The request body is resolved into an XML document (`intake`)
//! 2. A job workspace is created and the XML written into it (`workspace`)
//! 3. The report tool runs against it as a subprocess (`renderer`)
//! 4. The newest PDF in the workspace is picked up (`resolver`)
//! 5. It is moved to the output folder under a sanitized name (`finalize`)
//!
//! `service` ties the steps together and bounds concurrent renders.

pub mod finalize;
pub mod intake;
pub mod renderer;
pub mod resolver;
pub mod service;
pub mod workspace;

pub use finalize::{finalize, sanitize_file_name};
pub use intake::{read_document, XmlReference};
pub use renderer::{invoke, JarRenderer, RenderError, RenderJob, Renderer, RendererCommand};
pub use resolver::most_recent_file;
pub use service::{ReportService, ARTIFACT_EXTENSION};
pub use workspace::{unique_file_name, JobWorkspace};
