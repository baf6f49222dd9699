// src/lib.rs

// On déclare tous nos modules principaux pour les rendre publics et
// utilisables par nos programmes binaires (fill_watch.rs, change_alert.rs).
pub mod config;
pub mod monitoring;
pub mod notify;
pub mod persistence;
pub mod rpc;
pub mod watch;
