use crate::config::Config;
use crate::ledger::client::SuiReadClient;
use crate::ledger::processor::HistoryProcessor;

pub struct AppState {
    pub config: Config,
    pub processor: HistoryProcessor<SuiReadClient>,
}
