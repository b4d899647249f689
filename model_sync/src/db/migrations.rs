//! Migration scripts
//!
//! Writes planned DDL batches to timestamped SQL files for review.

use chrono::Utc;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Write `statements` to `<directory>/<timestamp>_model_sync.sql`
pub fn write_migration_file(directory: &Path, statements: &[String]) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;

    let filename = format!("{}_{}.sql", generate_migration_id(), "model_sync");
    let filepath = directory.join(filename);

    let mut file = File::create(&filepath)?;
    for statement in statements {
        writeln!(file, "{};", statement)?;
    }

    tracing::info!(path = %filepath.display(), statements = statements.len(), "Migration script written");
    Ok(filepath)
}

/// Generate a migration ID based on timestamp
fn generate_migration_id() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_migration_file() {
        let dir = tempfile::tempdir().unwrap();
        let statements = vec![
            "CREATE TABLE tags (label VARCHAR(255) NOT NULL)".to_string(),
            "ALTER TABLE users ADD COLUMN bio TEXT".to_string(),
        ];

        let path = write_migration_file(&dir.path().join("migrations"), &statements).unwrap();
        let contents = fs::read_to_string(&path).unwrap();

        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_model_sync.sql"));
        assert_eq!(
            contents,
            "CREATE TABLE tags (label VARCHAR(255) NOT NULL);\nALTER TABLE users ADD COLUMN bio TEXT;\n"
        );
    }
}
