//! Installer payload: where the script lives and how it is invoked.

use crate::types::CommandSpec;

/// The installable payload every task runs.
///
/// The agent fetches `<base_url>/<script>` into the task sandbox, then runs
/// `<interpreter> <script> <param> <param>`. Both parameters are forwarded
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub base_url: String,
    pub script: String,
    pub interpreter: String,
    pub params: [String; 2],
}

impl Payload {
    pub fn new(base_url: &str, script: &str, interpreter: &str, params: [String; 2]) -> Self {
        Self {
            base_url: base_url.to_string(),
            script: script.to_string(),
            interpreter: interpreter.to_string(),
            params,
        }
    }

    /// Location of the script the agent must fetch.
    pub fn script_uri(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.script)
    }

    pub fn command(&self) -> CommandSpec {
        let [first, second] = &self.params;
        CommandSpec {
            uris: vec![self.script_uri()],
            value: format!("{} {} {} {}", self.interpreter, self.script, first, second),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(base_url: &str) -> Payload {
        Payload::new(
            base_url,
            "install.py",
            "python",
            ["http://10.0.0.5/pkg".to_string(), "--verbose".to_string()],
        )
    }

    #[test]
    fn command_fetches_script_and_forwards_params() {
        let command = payload("http://10.0.0.5/pkg").command();
        assert_eq!(command.uris, vec!["http://10.0.0.5/pkg/install.py"]);
        assert_eq!(
            command.value,
            "python install.py http://10.0.0.5/pkg --verbose"
        );
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        assert_eq!(
            payload("http://10.0.0.5/pkg/").script_uri(),
            "http://10.0.0.5/pkg/install.py"
        );
    }
}
