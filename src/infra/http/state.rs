use std::sync::Arc;

use crate::application::crypto::CryptoService;
use crate::application::dataset::DatasetService;
use crate::application::files::FileBrowser;
use crate::application::worldbank::WorldBankService;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<DatasetService>,
    pub files: Arc<FileBrowser>,
    pub crypto: Arc<CryptoService>,
    pub worldbank: Arc<WorldBankService>,
    pub rate_limiter: ApiRateLimiter,
}
