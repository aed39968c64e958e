use std::ffi::OsString;
use std::path::Path;

/// Host-layer convenience for turning a discovered plugin's `entry` into
/// a runnable command: a pre-built artifact is executed directly; a
/// TypeScript source file is handed to whichever development-mode
/// transpiling launcher is resolvable on `PATH`, falling back to `node`
/// directly (which will fail at spawn time if the entry truly needs
/// transpilation — that failure surfaces as a normal spawn error, not a
/// special case here). Entry-sniffing is explicitly a host concern; a
/// supervisor can always be constructed with a hand-built
/// [`crate::StdioLaunchConfig`] instead.
pub fn resolve_command(entry_path: &Path) -> (OsString, Vec<OsString>) {
    match entry_path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") | Some("tsx") => {
            for launcher in ["tsx", "ts-node"] {
                if is_on_path(launcher) {
                    return (OsString::from(launcher), vec![entry_path.as_os_str().to_owned()]);
                }
            }
            (OsString::from("node"), vec![entry_path.as_os_str().to_owned()])
        }
        _ => (entry_path.as_os_str().to_owned(), Vec::new()),
    }
}

fn is_on_path(program: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| dir.join(program).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn prebuilt_artifact_runs_directly() {
        let entry = PathBuf::from("dist/index.js");
        let (command, args) = resolve_command(&entry);
        assert_eq!(command, OsString::from("dist/index.js"));
        assert!(args.is_empty());
    }
}
