//! FileIOSkill: read and write local files

use crate::context::ExecutionContext;
use crate::error::{self, Result};
use crate::function::{FunctionView, SkillFunction};
use crate::registry::SkillCollection;
use async_trait::async_trait;
use tracing::debug;

pub const COLLECTION: &str = "FileIOSkill";

#[derive(Debug, Clone, Copy)]
enum FileOp {
    Read,
    Write,
}

pub struct FileIoFunction {
    view: FunctionView,
    op: FileOp,
}

impl FileIoFunction {
    /// `ReadAsync`: returns the content of the file named by `path`, or by
    /// `input` when `path` is unset
    pub fn read() -> Self {
        Self {
            view: FunctionView::new(COLLECTION, "ReadAsync")
                .with_description("Read a file")
                .with_parameter("path", "Source file"),
            op: FileOp::Read,
        }
    }

    /// `WriteAsync`: writes `content` to `path`
    pub fn write() -> Self {
        Self {
            view: FunctionView::new(COLLECTION, "WriteAsync")
                .with_description("Write a file")
                .with_parameter("path", "Destination file")
                .with_parameter("content", "File content"),
            op: FileOp::Write,
        }
    }
}

#[async_trait]
impl SkillFunction for FileIoFunction {
    fn describe(&self) -> &FunctionView {
        &self.view
    }

    async fn invoke(&self, context: &ExecutionContext) -> Result<String> {
        let vars = context.variables();
        let name = self.view.qualified_name();

        match self.op {
            FileOp::Read => {
                let path = vars
                    .get_non_empty("path")
                    .or_else(|| vars.get_non_empty("input"))
                    .ok_or_else(|| error::missing_variable(&name, "path"))?;
                debug!(path, "reading file");
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| error::Error::from(e).with_context("path", path.to_string()))?;
                Ok(content)
            }
            FileOp::Write => {
                let path = vars
                    .get_non_empty("path")
                    .ok_or_else(|| error::missing_variable(&name, "path"))?;
                let content = vars.get("content").unwrap_or("");
                debug!(path, bytes = content.len(), "writing file");
                tokio::fs::write(path, content)
                    .await
                    .map_err(|e| error::Error::from(e).with_context("path", path.to_string()))?;
                Ok(String::new())
            }
        }
    }
}

pub fn register(collection: &mut SkillCollection) {
    collection
        .register(FileIoFunction::read())
        .register(FileIoFunction::write());
}
