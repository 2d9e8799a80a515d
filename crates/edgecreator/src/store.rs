//! A directory-backed implementation of every resolution collaborator.
//!
//! Layout under the store root:
//!
//! ```text
//! edges/<country>/gen/_<magazine>.<issue>.svg   current documents
//! edges/<country>/gen/<magazine>.<issue>.svg    published documents
//! edges/<country>/elements/<file>               image elements
//! legacy/<country>/<magazine>.json              legacy models
//! ```
//!
//! A legacy file holds the models of one publication:
//!
//! ```json
//! {
//!   "issues": ["1", "2", "3"],
//!   "models": [
//!     {
//!       "id": 42,
//!       "issueNumber": "1",
//!       "photo": "photo-1.jpg",
//!       "contributors": [{"contribution": "photographe", "userId": 7}],
//!       "steps": [{"stepNumber": 0, "functionName": "Remplir", "options": {}}]
//!     }
//!   ]
//! }
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, trace, warn};
use serde::Deserialize;

use edgecreator_core::publication::{IssueSelector, PublicationCode};
use edgecreator_legacy::record::{LegacyContribution, LegacyEdge, LegacyStep, ModelId};

use crate::{
    document::{DocumentStatus, ParsedDocument, parse_document},
    fetch::{
        AssetError, AssetSizeLookup, DocumentFetcher, FetchError, ImageSize, LegacyRecordFetcher,
        LegacyStepsById,
    },
};

const DOCUMENT_EXTENSION: &str = "svg";
const LEGACY_EXTENSION: &str = "json";

#[derive(Debug, Default, Deserialize)]
struct LegacyPublication {
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    models: Vec<LegacyModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyModel {
    id: ModelId,
    issue_number: String,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    contributors: Vec<LegacyContribution>,
    #[serde(default)]
    steps: Vec<LegacyStep>,
}

/// Documents, legacy models and image elements stored under one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document of `selector`.
    pub fn document_path(&self, selector: &IssueSelector, published: bool) -> PathBuf {
        let prefix = if published { "" } else { "_" };
        self.root
            .join("edges")
            .join(selector.country())
            .join("gen")
            .join(format!(
                "{prefix}{}.{}.{DOCUMENT_EXTENSION}",
                selector.magazine(),
                selector.issue_number()
            ))
    }

    /// Path of an element, given as `<country>/elements/<file>`.
    pub fn element_path(&self, element: &str) -> PathBuf {
        self.root.join("edges").join(element)
    }

    fn legacy_path(&self, publication: &PublicationCode) -> PathBuf {
        self.root
            .join("legacy")
            .join(publication.country())
            .join(format!("{}.{LEGACY_EXTENSION}", publication.magazine()))
    }

    /// Issue numbers of `publication`, in publication order.
    ///
    /// The `issues` list of the legacy file is authoritative. Without one,
    /// the issues of the legacy models come first, followed by the issues
    /// that only have a document, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Backend`] if the store cannot be read.
    pub fn publication_issues(&self, publication: &PublicationCode) -> Result<Vec<String>, FetchError> {
        let legacy = self.read_legacy(publication)?.unwrap_or_default();
        if !legacy.issues.is_empty() {
            return Ok(legacy.issues);
        }

        let mut issues: Vec<String> = Vec::new();
        for model in legacy.models {
            if !issues.contains(&model.issue_number) {
                issues.push(model.issue_number);
            }
        }

        let mut documented = self.documented_issues(publication)?;
        documented.sort();
        for issue in documented {
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
        Ok(issues)
    }

    fn documented_issues(&self, publication: &PublicationCode) -> Result<Vec<String>, FetchError> {
        let dir = self.root.join("edges").join(publication.country()).join("gen");
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(backend(&dir, &err)),
        };

        let mut issues = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| backend(&dir, &err))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(&format!(".{DOCUMENT_EXTENSION}")) else {
                continue;
            };
            let stem = stem.strip_prefix('_').unwrap_or(stem);
            let Some(issue) = stem
                .strip_prefix(publication.magazine())
                .and_then(|rest| rest.strip_prefix('.'))
            else {
                continue;
            };
            if !issues.iter().any(|known| known == issue) {
                issues.push(issue.to_string());
            }
        }
        Ok(issues)
    }

    fn read_legacy(&self, publication: &PublicationCode) -> Result<Option<LegacyPublication>, FetchError> {
        let path = self.legacy_path(publication);
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map(Some).map_err(|err| {
                warn!(path:? = path, err:% = err; "Unreadable legacy file");
                FetchError::Backend(format!("{}: {err}", path.display()))
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(backend(&path, &err)),
        }
    }

    /// Every legacy file of the store.
    fn legacy_publications(&self) -> Result<Vec<LegacyPublication>, FetchError> {
        let legacy_root = self.root.join("legacy");
        let countries = match fs::read_dir(&legacy_root) {
            Ok(countries) => countries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(backend(&legacy_root, &err)),
        };

        let mut publications = Vec::new();
        for country in countries {
            let country = country.map_err(|err| backend(&legacy_root, &err))?.path();
            if !country.is_dir() {
                continue;
            }
            for file in fs::read_dir(&country).map_err(|err| backend(&country, &err))? {
                let path = file.map_err(|err| backend(&country, &err))?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some(LEGACY_EXTENSION) {
                    continue;
                }
                let content = fs::read_to_string(&path).map_err(|err| backend(&path, &err))?;
                match serde_json::from_str(&content) {
                    Ok(publication) => publications.push(publication),
                    Err(err) => warn!(path:? = path, err:% = err; "Skipping unreadable legacy file"),
                }
            }
        }
        Ok(publications)
    }

    fn find_model<T>(
        &self,
        model_id: ModelId,
        extract: impl FnOnce(LegacyModel) -> T,
    ) -> Result<T, FetchError> {
        self.legacy_publications()?
            .into_iter()
            .flat_map(|publication| publication.models)
            .find(|model| model.id == model_id)
            .map(extract)
            .ok_or_else(|| FetchError::NotFound(format!("legacy model {model_id}")))
    }
}

impl DocumentFetcher for FileStore {
    fn fetch(&self, selector: &IssueSelector, published: bool) -> Result<ParsedDocument, FetchError> {
        let path = self.document_path(selector, published);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(path.display().to_string()));
            }
            Err(err) => return Err(backend(&path, &err)),
        };
        debug!(path:? = path; "Read edge document");

        let status = if published {
            DocumentStatus::Published
        } else {
            DocumentStatus::Current
        };
        parse_document(&content, status)
            .map_err(|err| FetchError::Backend(format!("{}: {err}", path.display())))
    }
}

impl LegacyRecordFetcher for FileStore {
    fn fetch_record(&self, selector: &IssueSelector) -> Result<Option<LegacyEdge>, FetchError> {
        let Some(publication) = self.read_legacy(selector.publication())? else {
            return Ok(None);
        };
        Ok(publication
            .models
            .into_iter()
            .find(|model| model.issue_number == selector.issue_number())
            .map(|model| LegacyEdge {
                id: model.id,
                issue_number: model.issue_number,
            }))
    }

    fn fetch_steps(&self, model_ids: &[ModelId]) -> Result<LegacyStepsById, FetchError> {
        trace!(models:? = model_ids; "Fetching legacy steps");
        let mut steps = LegacyStepsById::new();
        for model in self
            .legacy_publications()?
            .into_iter()
            .flat_map(|publication| publication.models)
        {
            if model_ids.contains(&model.id) {
                steps.insert(model.id, model.steps);
            }
        }
        Ok(steps)
    }

    fn fetch_contributors(&self, model_id: ModelId) -> Result<Vec<LegacyContribution>, FetchError> {
        self.find_model(model_id, |model| model.contributors)
    }

    fn fetch_main_photo(&self, model_id: ModelId) -> Result<Option<String>, FetchError> {
        self.find_model(model_id, |model| model.photo)
    }
}

impl AssetSizeLookup for FileStore {
    fn fetch_image_size(&self, path: &str) -> Result<ImageSize, AssetError> {
        let file = self.element_path(path);
        if !file.is_file() {
            return Err(AssetError::NotFound(path.to_string()));
        }
        let (width, height) = image::image_dimensions(&file).map_err(|err| AssetError::Backend {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        Ok(ImageSize::new(f64::from(width), f64::from(height)))
    }
}

fn backend(path: &Path, err: &io::Error) -> FetchError {
    FetchError::Backend(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn publication() -> PublicationCode {
        PublicationCode::new("fr", "DDD")
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let legacy = json!({
            "models": [
                {
                    "id": 42,
                    "issueNumber": "2",
                    "photo": "photo-2.jpg",
                    "contributors": [{"contribution": "photographe", "userId": 7}],
                    "steps": [{"stepNumber": 0, "functionName": "Remplir", "options": {}}]
                },
                {"id": 43, "issueNumber": "1"}
            ]
        });
        write(dir.path(), "legacy/fr/DDD.json", &legacy.to_string());
        write(
            dir.path(),
            "edges/fr/gen/_DDD.3.svg",
            r#"<svg width="22.5" height="300"></svg>"#,
        );
        write(
            dir.path(),
            "edges/fr/gen/DDD.3.svg",
            r#"<svg width="22.5" height="300"></svg>"#,
        );
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_document_paths() {
        let store = FileStore::new("/store");
        let issue = IssueSelector::new(publication(), "12");

        assert_eq!(
            store.document_path(&issue, false),
            PathBuf::from("/store/edges/fr/gen/_DDD.12.svg")
        );
        assert_eq!(
            store.document_path(&issue, true),
            PathBuf::from("/store/edges/fr/gen/DDD.12.svg")
        );
    }

    #[test]
    fn test_fetch_document() {
        let (_dir, store) = store();

        let document = store
            .fetch(&IssueSelector::new(publication(), "3"), true)
            .unwrap();
        assert_eq!(document.status(), DocumentStatus::Published);
        assert_eq!(document.width(), 22.5);

        let missing = store.fetch(&IssueSelector::new(publication(), "4"), false);
        assert!(matches!(missing, Err(FetchError::NotFound(_))));
    }

    #[test]
    fn test_legacy_lookups() {
        let (_dir, store) = store();

        let record = store
            .fetch_record(&IssueSelector::new(publication(), "2"))
            .unwrap()
            .unwrap();
        assert_eq!(record.id, 42);

        let steps = store.fetch_steps(&[42, 43, 99]).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[&42u64][0].function_name, "Remplir");
        assert!(steps[&43u64].is_empty());

        assert_eq!(store.fetch_main_photo(42).unwrap().as_deref(), Some("photo-2.jpg"));
        assert_eq!(store.fetch_contributors(42).unwrap()[0].user_id, 7);
        assert!(matches!(store.fetch_main_photo(99), Err(FetchError::NotFound(_))));
        assert_eq!(
            store
                .fetch_record(&IssueSelector::new(PublicationCode::new("it", "TL"), "1"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_publication_issues_without_list() {
        let (_dir, store) = store();

        assert_eq!(store.publication_issues(&publication()).unwrap(), ["2", "1", "3"]);
    }

    #[test]
    fn test_publication_issues_from_list() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "legacy/fr/DDD.json",
            &json!({"issues": ["1", "2", "3", "4"]}).to_string(),
        );
        let store = FileStore::new(dir.path());

        assert_eq!(store.publication_issues(&publication()).unwrap().len(), 4);
    }

    #[test]
    fn test_image_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edges/fr/elements/logo.png");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::new(4, 8).save(&path).unwrap();
        let store = FileStore::new(dir.path());

        let size = store.fetch_image_size("fr/elements/logo.png").unwrap();
        assert_eq!(size, ImageSize::new(4.0, 8.0));
        assert!(matches!(
            store.fetch_image_size("fr/elements/missing.png"),
            Err(AssetError::NotFound(_))
        ));
    }
}
