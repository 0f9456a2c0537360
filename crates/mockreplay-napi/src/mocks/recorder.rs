//! NAPI bindings for recording.

use crate::config::{config_error, load, CapturedExchange};
use crate::mocks::source_name;
use mockreplay_core::mocks::{
    CapturedExchange as CoreCapturedExchange, RecordOutcome, Recorder as CoreRecorder,
};
use mockreplay_core::store::{FsFixtureStore, StoreError};
use napi::bindgen_prelude::*;
use napi_derive::napi;

fn store_error(e: StoreError) -> Error {
    Error::from_reason(e.to_string())
}

/// Outcome of recording one exchange
#[napi(object)]
pub struct RecordResult {
    /// `stored`, `duplicate` or `skipped`
    pub status: String,
    /// Id of the new fixture, or of the existing one for duplicates
    pub id: Option<String>,
    /// `test` or `default` for duplicates
    pub source: Option<String>,
}

#[napi]
pub struct Recorder {
    inner: CoreRecorder<FsFixtureStore>,
}

#[napi]
impl Recorder {
    /// Start recording a test, registering it when needed
    ///
    /// @param configPath - Path to the replay config file
    /// @param testName - Name of the test to record into
    #[napi]
    pub async fn open(config_path: String, test_name: String) -> Result<Recorder> {
        let config = load(&config_path)?;
        let options = config.record_options().map_err(config_error)?;
        let store = config.store();
        store.create_test(&test_name).await.map_err(store_error)?;

        Ok(Self {
            inner: CoreRecorder::new(store, test_name, options),
        })
    }

    /// Whether the URL matches `recordPattern`
    #[napi]
    pub fn should_record(&self, url: String) -> bool {
        self.inner.should_record(&url)
    }

    /// Store an exchange as a fixture unless it is a duplicate
    #[napi]
    pub async fn record(&self, exchange: CapturedExchange) -> Result<RecordResult> {
        let exchange: CoreCapturedExchange = exchange.try_into()?;
        let outcome = self.inner.record(&exchange).await.map_err(store_error)?;

        Ok(match outcome {
            RecordOutcome::Stored(fixture) => RecordResult {
                status: "stored".to_string(),
                id: Some(fixture.id),
                source: None,
            },
            RecordOutcome::Duplicate {
                source,
                existing_id,
            } => RecordResult {
                status: "duplicate".to_string(),
                id: Some(existing_id),
                source: Some(source_name(source)),
            },
            RecordOutcome::Skipped => RecordResult {
                status: "skipped".to_string(),
                id: None,
                source: None,
            },
        })
    }

    /// Save a binary response payload under the test's `_files` directory
    ///
    /// @returns Absolute path of the written file
    #[napi]
    pub async fn save_file(&self, name: String, content: Buffer) -> Result<String> {
        let path = self
            .inner
            .store()
            .write_response_file(self.inner.session(), &name, &content)
            .await
            .map_err(store_error)?;
        Ok(path.display().to_string())
    }
}
