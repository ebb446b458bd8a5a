use std::{fs::create_dir_all, path::PathBuf};

use crate::failure::{Failure, Ignore};

/// Path to the config directory.
pub fn config_dir() -> PathBuf {
    let dir = dirs::config_dir()
        .report_and_panic("The config directory could not be retrieved")
        .join("wlx-screen");

    create_dir_all(&dir)
        .report("Could not create the config directory")
        .ignore();

    dir
}
