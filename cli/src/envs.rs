use rust_dotenv::dotenv::DotEnv;
use std::collections::HashMap;

/// Env variables defined in outer files
pub struct Envs;

impl Envs {
    /// Read variables from the .env file in the current dir
    pub fn load() -> HashMap<String, String> {
        if !std::path::Path::new(".env").exists() {
            log::debug!("No .env file found");
            return HashMap::new();
        }

        DotEnv::new("").all_vars().to_owned()
    }

    /// Look a variable up in the process env first, then in the loaded .env vars
    ///
    /// A blank process variable counts as unset.
    pub fn lookup(dotenv: &HashMap<String, String>, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| dotenv.get(name).cloned())
    }
}
