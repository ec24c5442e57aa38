use std::{
    io::prelude::*,
    path::Path,
    sync::{Arc, Mutex},
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::cli;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HeaderSettingsFile {
    pub name: String,
    pub version: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SettingsStruct {
    pub header: HeaderSettingsFile,
    /// Last user-selected brightness, restored on startup and after screen-on.
    pub brightness_percent: u8,
    /// Optional sysfs path written `1`/`0` to inhibit touch input while the
    /// screen is off.
    pub touch_inhibit_path: Option<String>,
}

impl Default for SettingsStruct {
    fn default() -> Self {
        SettingsStruct {
            header: HeaderSettingsFile {
                name: "System Telemetry Manager".to_string(),
                version: 0,
            },
            brightness_percent: 60,
            touch_inhibit_path: None,
        }
    }
}

#[derive(Debug)]
struct ManagerStruct {
    pub file_name: String,
    pub config: SettingsStruct,
}

struct Manager {
    pub content: Option<ManagerStruct>,
}

lazy_static! {
    static ref MANAGER: Arc<Mutex<Manager>> = Arc::new(Mutex::new(Manager { content: None }));
}

impl Manager {
    fn new(file_name: &str) -> ManagerStruct {
        let file_name = if !Path::new(file_name).is_absolute() {
            match ProjectDirs::from("com", "Blue Robotics", env!("CARGO_PKG_NAME")) {
                Some(project) => {
                    let folder_path = Path::new(project.config_dir());
                    if let Err(error) = std::fs::create_dir_all(folder_path) {
                        error!("Failed to create settings folder: {folder_path:?}, reason: {error:#?}");
                    }
                    folder_path
                        .join(file_name)
                        .to_str()
                        .expect("Failed to create settings path.")
                        .to_string()
                }
                None => panic!("Failed to find user settings path."),
            }
        } else {
            file_name.into()
        };

        debug!("Using settings file: {file_name}");

        let settings = ManagerStruct {
            file_name: file_name.clone(),
            config: load_settings_from_file(&file_name),
        };

        save_settings_to_file(&settings.file_name, &settings.config).unwrap_or_else(|error| {
            error!("Failed to save settings file: {error:#?}");
        });

        settings
    }
}

// Init settings manager with the desired settings file,
// will be created if it does not exist
pub fn init(file_name: Option<&str>) {
    let mut manager = MANAGER.lock().unwrap();
    let file_name = file_name.unwrap_or("settings.json");
    manager.content = Some(Manager::new(file_name));
}

fn load_settings_from_file(file_name: &str) -> SettingsStruct {
    let result = std::fs::read_to_string(file_name);

    if result.is_err() || cli::manager::is_reset() {
        return SettingsStruct::default();
    };

    serde_json::from_str(result.unwrap().as_str()).unwrap_or_default()
}

fn save_settings_to_file(file_name: &str, content: &SettingsStruct) -> std::io::Result<()> {
    let mut file = std::fs::File::create(file_name)?;
    let value = serde_json::to_string_pretty(content)
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error))?;
    file.write_all(value.as_bytes())
}

// Save the latest state of the settings
pub fn save() {
    let manager = MANAGER.lock().unwrap();
    if let Some(content) = &manager.content {
        if let Err(error) = save_settings_to_file(&content.file_name, &content.config) {
            error!(
                "Failed to save settings: file: {:#?}, error: {error:#?}",
                &content.file_name
            );
        }
    }
}

pub fn header() -> HeaderSettingsFile {
    let manager = MANAGER.lock().unwrap();
    manager.content.as_ref().unwrap().config.header.clone()
}

pub fn brightness_percent() -> u8 {
    let manager = MANAGER.lock().unwrap();
    manager
        .content
        .as_ref()
        .map(|content| content.config.brightness_percent)
        .unwrap_or_else(|| SettingsStruct::default().brightness_percent)
}

pub fn set_brightness_percent(percent: u8) {
    // Take care of scope mutex
    {
        let mut manager = MANAGER.lock().unwrap();
        if let Some(content) = manager.content.as_mut() {
            content.config.brightness_percent = percent;
        }
    }
    save();
}

pub fn touch_inhibit_path() -> Option<String> {
    let manager = MANAGER.lock().unwrap();
    manager
        .content
        .as_ref()
        .and_then(|content| content.config.touch_inhibit_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn generate_random_settings_file_name() -> String {
        use rand::Rng;

        let rand_string: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(30)
            .map(char::from)
            .collect();

        format!("/tmp/{rand_string}.json")
    }

    #[test]
    #[serial]
    fn test_store() {
        init(Some(&generate_random_settings_file_name()));

        let header = header();
        assert_eq!(header.name, "System Telemetry Manager".to_string());

        set_brightness_percent(42);
        assert_eq!(brightness_percent(), 42);

        save();
    }

    #[test]
    #[serial]
    fn test_reload_from_disk() {
        let file_name = generate_random_settings_file_name();
        init(Some(&file_name));
        set_brightness_percent(77);

        // A fresh init against the same file restores the persisted value
        init(Some(&file_name));
        assert_eq!(brightness_percent(), 77);
    }
}
