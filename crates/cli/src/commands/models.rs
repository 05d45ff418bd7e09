//! `toolloop models`: list the supported model ids.

use toolloop_core::model::SupportedModel;

pub fn run() {
    let default = SupportedModel::default();
    for model in SupportedModel::ALL {
        let marker = if model == default { " (default)" } else { "" };
        println!("{model}{marker}");
    }
}
