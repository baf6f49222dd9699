// DANS : src/notify/sound.rs

use std::process::{Command, Stdio};
use tracing::debug;

/// Joue le signal d'attention via `paplay`, détaché et sans attendre la
/// fin. Tout échec est ignoré : le son est un confort, pas une garantie.
pub fn play(sound_path: &str) {
    let spawned = Command::new("paplay")
        .arg(sound_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(error) = spawned {
        debug!(error = %error, "[Notify] Impossible de jouer le signal sonore.");
    }
}
