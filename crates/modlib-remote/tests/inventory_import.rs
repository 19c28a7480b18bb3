//! Integration tests for the remote inventory importer, driven by a mock
//! inventory endpoint.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use modlib_core::{
    new_shared_state, FileKind, ImportError, ImportWarning, InventoryEndpointPort,
    InventoryModuleDescriptor, ManifestValue, ModuleType, RemoteModuleFile, SharedState,
    TransportError,
};
use modlib_remote::{InventoryImporter, ENDPOINT_PRIVATE_KEY};

fn file(name: &str, content: &str) -> RemoteModuleFile {
    RemoteModuleFile {
        file_name: name.to_string(),
        raw: content.as_bytes().to_vec(),
    }
}

/// A well-formed management-capable module: manifest, one adapter
/// definition, and a types/formats pair.
fn disk_descriptor() -> InventoryModuleDescriptor {
    InventoryModuleDescriptor {
        name: "Disk".to_string(),
        session_only: false,
        files: vec![
            file(
                "Disk.psd1",
                "@{ ModuleVersion = '1.0'; NestedModules = @('DiskInfo.cdxml'); \
                 TypesToProcess = @('Disk.Types.ps1xml'); \
                 FormatsToProcess = @('Disk.Format.ps1xml') }",
            ),
            file(
                "DiskInfo.cdxml",
                "<Class ClassName=\"root/storage/Disk\" CmdletAdapter=\"CimCmdletAdapter\"/>",
            ),
            file("Disk.Types.ps1xml", "<Types/>"),
            file("Disk.Format.ps1xml", "<Configuration/>"),
        ],
    }
}

struct MockEndpoint {
    descriptors: Vec<InventoryModuleDescriptor>,
    query_calls: AtomicUsize,
}

impl MockEndpoint {
    fn new(descriptors: Vec<InventoryModuleDescriptor>) -> Self {
        Self {
            descriptors,
            query_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InventoryEndpointPort for MockEndpoint {
    fn endpoint_id(&self) -> String {
        "https://mgmt.example.test/api#root/storage".to_string()
    }

    async fn query_modules(
        &self,
        patterns: &[String],
        _cancel: &CancellationToken,
    ) -> Result<Vec<InventoryModuleDescriptor>, TransportError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .descriptors
            .iter()
            .filter(|d| {
                patterns.iter().any(|p| {
                    p == "*" || p.eq_ignore_ascii_case(&d.name)
                })
            })
            .cloned()
            .collect())
    }
}

fn staging_dirs(root: &Path) -> usize {
    let Ok(endpoints) = std::fs::read_dir(root) else {
        return 0;
    };
    endpoints
        .filter_map(Result::ok)
        .filter_map(|endpoint| std::fs::read_dir(endpoint.path()).ok())
        .map(|entries| entries.filter_map(Result::ok).count())
        .sum()
}

async fn table_len(state: &SharedState) -> usize {
    state.lock().await.all_modules.len()
}

fn importer_over(root: &Path) -> (InventoryImporter, SharedState) {
    let state = new_shared_state();
    (
        InventoryImporter::new(Arc::clone(&state), root.to_path_buf()),
        state,
    )
}

#[tokio::test]
async fn flattens_classifies_and_rewires_a_module() {
    let root = tempfile::tempdir().unwrap();
    let (importer, state) = importer_over(root.path());
    let endpoint: Arc<dyn InventoryEndpointPort> =
        Arc::new(MockEndpoint::new(vec![disk_descriptor()]));

    let batch = importer
        .import(
            &endpoint,
            &["Disk".to_string()],
            false,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(batch.is_complete_success());
    assert_eq!(batch.records.len(), 1);
    let record = &batch.records[0];
    assert_eq!(record.name, "Disk");
    assert_eq!(record.module_type, ModuleType::Manifest);
    assert_eq!(record.version, Some("1.0".parse().unwrap()));

    // Every served file landed under a regenerated name, marked intranet.
    assert_eq!(record.staged_files.len(), 4);
    for staged in &record.staged_files {
        let staged_name = staged.path.file_name().unwrap().to_str().unwrap();
        assert!(staged_name.contains('_'), "{staged_name} should be regenerated");
        assert!(staged.path.exists());
    }
    let kinds: Vec<FileKind> = record.staged_files.iter().map(|f| f.kind).collect();
    assert!(kinds.contains(&FileKind::Cmdletization));
    assert!(kinds.contains(&FileKind::Types));
    assert!(kinds.contains(&FileKind::Formats));
    assert!(kinds.contains(&FileKind::Manifest));

    // The nested adapter module resolved against the rewritten manifest
    // and carries the endpoint identity in its private data.
    assert_eq!(record.nested.len(), 1);
    let nested = &record.nested[0];
    assert_eq!(nested.module_type, ModuleType::Cim);
    assert_eq!(nested.adapter.as_deref(), Some("CimCmdletAdapter"));
    assert_eq!(
        nested
            .private_data
            .get(ENDPOINT_PRIVATE_KEY)
            .and_then(ManifestValue::as_text),
        Some("https://mgmt.example.test/api#root/storage")
    );

    assert_eq!(table_len(&state).await, 1);
}

#[tokio::test]
async fn second_import_short_circuits_on_the_versioned_path() {
    let root = tempfile::tempdir().unwrap();
    let (importer, state) = importer_over(root.path());
    let endpoint: Arc<dyn InventoryEndpointPort> =
        Arc::new(MockEndpoint::new(vec![disk_descriptor()]));
    let cancel = CancellationToken::new();

    let first = importer
        .import(&endpoint, &["Disk".to_string()], false, &cancel)
        .await
        .unwrap();
    let second = importer
        .import(&endpoint, &["Disk".to_string()], false, &cancel)
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first.records[0], &second.records[0]));
    assert_eq!(staging_dirs(root.path()), 1);
    assert_eq!(table_len(&state).await, 1);
}

#[tokio::test]
async fn unsupported_adapter_aborts_and_leaves_no_staging() {
    let root = tempfile::tempdir().unwrap();
    let (importer, state) = importer_over(root.path());
    let descriptor = InventoryModuleDescriptor {
        name: "Custom".to_string(),
        session_only: false,
        files: vec![
            file(
                "Custom.psd1",
                "@{ ModuleVersion = '2.0'; NestedModules = @('Custom.cdxml') }",
            ),
            file(
                "Custom.cdxml",
                "<Class ClassName=\"root/x\" CmdletAdapter=\"ThirdPartyAdapter\"/>",
            ),
        ],
    };
    let endpoint: Arc<dyn InventoryEndpointPort> = Arc::new(MockEndpoint::new(vec![descriptor]));

    let batch = importer
        .import(
            &endpoint,
            &["Custom".to_string()],
            false,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(batch.records.is_empty());
    assert_eq!(batch.failures.len(), 1);
    assert!(matches!(
        batch.failures[0].error,
        ImportError::UnsupportedAdapter { .. }
    ));
    assert_eq!(staging_dirs(root.path()), 0);
    assert_eq!(table_len(&state).await, 0);
}

#[tokio::test]
async fn mixed_mode_module_warns_but_imports() {
    let root = tempfile::tempdir().unwrap();
    let (importer, _state) = importer_over(root.path());
    // One declared nested module, zero adapter definitions.
    let descriptor = InventoryModuleDescriptor {
        name: "Hybrid".to_string(),
        session_only: false,
        files: vec![file(
            "Hybrid.psd1",
            "@{ ModuleVersion = '1.0'; NestedModules = @('Helper.psm1') }",
        )],
    };
    let endpoint: Arc<dyn InventoryEndpointPort> = Arc::new(MockEndpoint::new(vec![descriptor]));

    let batch = importer
        .import(
            &endpoint,
            &["Hybrid".to_string()],
            false,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(batch.records.len(), 1, "partial success still yields a record");
    assert_eq!(batch.warnings.len(), 1);
    assert!(matches!(
        batch.warnings[0],
        ImportWarning::PartialCapability { .. }
    ));
}

#[tokio::test]
async fn session_only_and_missing_names_report_individually() {
    let root = tempfile::tempdir().unwrap();
    let (importer, _state) = importer_over(root.path());
    let mut session_only = disk_descriptor();
    session_only.name = "Interactive".to_string();
    session_only.session_only = true;
    let endpoint: Arc<dyn InventoryEndpointPort> =
        Arc::new(MockEndpoint::new(vec![disk_descriptor(), session_only]));

    let batch = importer
        .import(
            &endpoint,
            &[
                "Disk".to_string(),
                "Interactive".to_string(),
                "Absent".to_string(),
            ],
            false,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // The good sibling still imports.
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].name, "Disk");

    let by_id = |id: &str| {
        batch
            .failures
            .iter()
            .find(|f| f.identifier == id)
            .map(|f| &f.error)
    };
    assert!(matches!(
        by_id("Interactive"),
        Some(ImportError::SessionOnly { .. })
    ));
    assert!(matches!(by_id("Absent"), Some(ImportError::NotFound { .. })));
}

#[tokio::test]
async fn cancelled_token_leaves_no_partial_state() {
    let root = tempfile::tempdir().unwrap();
    let (importer, state) = importer_over(root.path());
    let endpoint: Arc<dyn InventoryEndpointPort> =
        Arc::new(MockEndpoint::new(vec![disk_descriptor()]));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = importer
        .import(&endpoint, &["Disk".to_string()], false, &cancel)
        .await;

    // Whether the cancellation lands on the query or on the item, nothing
    // may be half-materialized.
    match outcome {
        Ok(batch) => {
            assert!(batch.records.is_empty());
            assert!(!batch.failures.is_empty());
        }
        Err(error) => assert!(matches!(error, ImportError::Cancelled { .. })),
    }
    assert_eq!(staging_dirs(root.path()), 0);
    assert_eq!(table_len(&state).await, 0);
}
