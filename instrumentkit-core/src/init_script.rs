//! The `-i/--init_script` supplemental feature: a flat file of newline
//! separated JSON instructions, replayed against the registry once at
//! startup before the router begins accepting connections.

use std::fs;
use std::path::Path;

use instrumentkit_types::Instruction;

use crate::dispatcher::Dispatcher;
use crate::error::CoreError;

/// Execute every instruction in `path`, in file order. A line that fails to
/// parse or whose handler returns an error is logged and skipped rather than
/// aborting the remaining lines — a single bad entry in a long startup
/// script shouldn't prevent the server from coming up.
pub fn run(path: &Path, dispatcher: &Dispatcher) -> Result<(), CoreError> {
    let text = fs::read_to_string(path)?;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let instruction: Instruction = match serde_json::from_str(line) {
            Ok(instr) => instr,
            Err(e) => {
                log::warn!("init script {}:{}: malformed instruction: {e}", path.display(), lineno + 1);
                continue;
            }
        };
        let response = dispatcher.dispatch(&instruction);
        if !response.is_ok() {
            log::warn!("init script {}:{}: instruction failed: {response:?}", path.display(), lineno + 1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::BroadcastBus;
    use crate::registry::Registry;
    use std::sync::Arc;

    #[test]
    fn replays_instructions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.txt");
        fs::write(
            &path,
            concat!(
                "{\"operation\":\"create_instrument\",\"target\":\"dmm\",\"name\":\"t.Dummy\"}\n",
                "{\"operation\":\"set\",\"target\":\"dmm\",\"name\":\"voltage\",\"value\":2.5}\n",
            ),
        )
        .unwrap();

        let registry = Arc::new(Registry::with_builtins());
        let dispatcher = Dispatcher::new(registry.clone(), Arc::new(BroadcastBus::new()));
        run(&path, &dispatcher).unwrap();

        let inst = registry.get("dmm").unwrap();
        assert_eq!(inst.get(&["voltage"]).unwrap(), instrumentkit_types::ParamValue::Float(2.5));
    }

    #[test]
    fn skips_malformed_lines_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.txt");
        fs::write(&path, "not json\n{\"operation\":\"list_instruments\"}\n").unwrap();

        let registry = Arc::new(Registry::with_builtins());
        let dispatcher = Dispatcher::new(registry, Arc::new(BroadcastBus::new()));
        assert!(run(&path, &dispatcher).is_ok());
    }
}
