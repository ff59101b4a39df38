use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_TEMPLATE: &str = "default_prompt";
const TEMPLATE_EXT: &str = ".txt";

/// Instruction templates stored as `<name>.txt` files in one directory.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for `name`, falling back to the default template and
    /// appending `.txt` when it is missing.
    pub fn file_name(name: &str) -> String {
        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_TEMPLATE } else { name };
        if name.ends_with(TEMPLATE_EXT) {
            name.to_string()
        } else {
            format!("{name}{TEMPLATE_EXT}")
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(Self::file_name(name))
    }

    pub async fn resolve(&self, name: &str) -> Result<String> {
        let path = self.path_for(name);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::Configuration(format!(
                "Prompt file '{}' could not be read: {}",
                path.display(),
                e
            ))
        })?;

        let instruction = content.trim();
        if instruction.is_empty() {
            return Err(Error::Configuration(format!(
                "Prompt file '{}' is empty",
                path.display()
            )));
        }

        log::info!("Prompt file {} loaded.", path.display());
        Ok(instruction.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn names_get_default_and_extension() {
        assert_eq!(PromptLibrary::file_name(""), "default_prompt.txt");
        assert_eq!(PromptLibrary::file_name("  "), "default_prompt.txt");
        assert_eq!(PromptLibrary::file_name("history"), "history.txt");
        assert_eq!(PromptLibrary::file_name("history.txt"), "history.txt");
    }

    #[tokio::test]
    async fn resolves_and_trims_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("quiz.txt"), "\n  Answer with the letter only.\n").unwrap();

        let library = PromptLibrary::new(dir.path());
        assert_eq!(
            library.resolve("quiz").await.unwrap(),
            "Answer with the letter only."
        );
    }

    #[tokio::test]
    async fn missing_or_empty_template_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let library = PromptLibrary::new(dir.path());
        assert!(matches!(
            library.resolve("absent").await,
            Err(Error::Configuration(_))
        ));

        std::fs::write(dir.path().join("default_prompt.txt"), "   \n").unwrap();
        assert!(matches!(
            library.resolve("").await,
            Err(Error::Configuration(_))
        ));
    }
}
