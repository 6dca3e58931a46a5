// =============================================================================
// command.rs - Picker natif via un programme externe installé
// command.rs - Native picker through an installed helper program
// =============================================================================
//
// `hyprpicker` ou `xcolor` prennent le pointeur, laissent cliquer n'importe
// où et écrivent la couleur sur stdout. Un code de sortie non nul signifie
// que l'utilisateur ou le compositeur a refusé.
// `hyprpicker` or `xcolor` grab the pointer, let the user click anywhere
// and print the color on stdout. A non-zero exit status means the user or
// the compositor refused.

use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use crossbeam_channel::select;
use tracing::{debug, info, warn};

use super::common::CancelToken;
use super::native::NativePicker;
use crate::color::{hex_to_rgb, Rgb};
use crate::error::NativePickError;

/// Programmes connus, essayés dans l'ordre, avec les arguments pour sortir de l'hexa
/// Known helpers, tried in order, with the arguments that make them print hex
const KNOWN_HELPERS: &[(&str, &[&str])] = &[
    ("hyprpicker", &["--format=hex", "--no-fancy"]),
    ("xcolor", &["--format", "hex"]),
];

/// Intervalle de scrutation du processus enfant
/// Child process polling interval
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct CommandPicker {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandPicker {
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self { program: program.into(), args: args.iter().map(|a| (*a).to_string()).collect() }
    }

    /// Premier programme connu trouvé dans le `PATH`
    /// First known helper found on `PATH`
    pub fn detect() -> Option<Self> {
        KNOWN_HELPERS.iter().find_map(|(name, args)| {
            find_on_path(Path::new(name)).map(|path| {
                info!(helper = %path.display(), "Found native screen picker helper");
                Self::new(path, args)
            })
        })
    }

    fn wait_for_exit(&self, child: &mut Child, cancel: &CancelToken) -> Result<Rgb, NativePickError> {
        loop {
            select! {
                recv(cancel.signal()) -> _ => {
                    debug!(program = %self.program.display(), "Killing helper after cancellation");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(NativePickError::Aborted);
                },
                default(POLL_INTERVAL) => {}
            }

            let status = child
                .try_wait()
                .map_err(|e| NativePickError::Unavailable(e.to_string()))?;
            let Some(status) = status else {
                continue;
            };

            let mut output = String::new();
            if let Some(mut stdout) = child.stdout.take() {
                let _ = stdout.read_to_string(&mut output);
            }

            if !status.success() {
                return Err(NativePickError::Denied(format!("{} exited with {status}", self.program.display())));
            }
            return parse_hex_output(&output)
                .ok_or_else(|| NativePickError::Denied(format!("no color in helper output {:?}", output.trim())));
        }
    }
}

impl NativePicker for CommandPicker {
    fn is_available(&self) -> bool {
        find_on_path(&self.program).is_some()
    }

    fn pick_pixel(&self, cancel: &CancelToken) -> Result<Rgb, NativePickError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                warn!(program = %self.program.display(), error = %e, "Failed to start picker helper");
                NativePickError::Unavailable(e.to_string())
            })?;

        self.wait_for_exit(&mut child, cancel)
    }
}

/// Premier jeton `#RRGGBB` / `#RGB` de la sortie
/// First `#RRGGBB` / `#RGB` token of the output
fn parse_hex_output(output: &str) -> Option<Rgb> {
    output
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|token| token.starts_with('#'))
        .find_map(|token| hex_to_rgb(token).ok())
}

/// Résout un nom de programme comme un shell ; les chemins sont testés tels quels
/// Resolves a program name like a shell does; paths are checked as-is
fn find_on_path(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
