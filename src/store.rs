// ABOUTME: Durable storage of the BindingSet as a TOML file in the app's config directory
// ABOUTME: Loads fail soft to an empty set; saves replace the file atomically via temp-file rename

use crate::conflict;
use crate::hotkey::HotKeyBinding;
use crate::model::BindingSet;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const CORRUPT_SUFFIX: &str = "corrupt";

pub struct BindingStore {
    path: PathBuf,
    default_toggle: HotKeyBinding,
}

impl BindingStore {
    pub fn new(path: impl Into<PathBuf>, default_toggle: HotKeyBinding) -> Self {
        Self {
            path: path.into(),
            default_toggle,
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(config_dir.join("keylaunch").join("bindings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or unreadable file yields an empty set with the
    /// default toggle. A malformed file is moved aside so the next save does
    /// not destroy it.
    pub fn load(&self) -> BindingSet {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "No bindings file yet, starting empty");
            return self.empty();
        }

        match self.read() {
            Ok(mut set) => {
                for duplicate in conflict::find_conflicts(&set) {
                    tracing::warn!(
                        chord = %duplicate.binding,
                        slots = duplicate.slots.len(),
                        "Persisted bindings reuse a chord; keeping the first"
                    );
                }
                let cleared = set.sanitize();
                if !cleared.is_empty() {
                    tracing::warn!(
                        path = %self.path.display(),
                        cleared = cleared.len(),
                        "Cleared conflicting or unusable bindings from persisted set"
                    );
                }
                tracing::debug!(items = set.items.len(), "Loaded binding set");
                set
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Ignoring malformed bindings file: {e:#}"
                );
                self.quarantine();
                self.empty()
            }
        }
    }

    fn read(&self) -> Result<BindingSet> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read bindings file: {}", self.path.display()))?;
        toml::from_str(&content).context("Failed to parse bindings file")
    }

    fn quarantine(&self) {
        let aside = self.path.with_extension(CORRUPT_SUFFIX);
        if let Err(e) = fs::rename(&self.path, &aside) {
            tracing::warn!(
                path = %self.path.display(),
                "Could not move malformed bindings aside: {e}"
            );
        }
    }

    fn empty(&self) -> BindingSet {
        BindingSet::new(self.default_toggle)
    }

    /// Writes to a temp file in the same directory and renames it over the
    /// target, so readers see either the old or the new file.
    pub fn save(&self, set: &BindingSet) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;

        let content = toml::to_string_pretty(set).context("Failed to serialize bindings")?;

        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write bindings")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to flush bindings")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace bindings file: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), items = set.items.len(), "Saved binding set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifiers;
    use crate::hotkey::keys::KEY_SPACE;
    use crate::model::LaunchItem;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> BindingStore {
        BindingStore::new(
            dir.path().join("nested").join("bindings.toml"),
            HotKeyBinding::default_toggle(),
        )
    }

    fn chord(key_code: u32, modifiers: Modifiers) -> HotKeyBinding {
        HotKeyBinding::new(key_code, modifiers).unwrap()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let set = store_in(&dir).load();
        assert_eq!(set, BindingSet::default());
    }

    #[test]
    fn test_round_trip_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let set = BindingSet::default();
        store.save(&set).unwrap();
        assert_eq!(store.load(), set);
    }

    #[test]
    fn test_round_trip_mixed_slots() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut set = BindingSet::new(chord(KEY_SPACE, Modifiers::CONTROL | Modifiers::OPTION));
        let mut plain = LaunchItem::from_path("/Applications/Foo.app");
        plain.open_hotkey = Some(chord(KEY_SPACE, Modifiers::COMMAND | Modifiers::SHIFT));
        plain.alias = Some("foo".to_string());
        let bare = LaunchItem::from_path("/Users/me/Documents");
        let mut ide = LaunchItem::from_path("/Applications/Zed.app");
        ide.extension_hotkey = Some(chord(6, Modifiers::COMMAND | Modifiers::CONTROL));
        set.items.extend([plain, bare, ide]);

        store.save(&set).unwrap();
        assert_eq!(store.load(), set);
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut set = BindingSet::default();
        set.items.push(LaunchItem::from_path("/Applications/Foo.app"));
        store.save(&set).unwrap();

        set.items.clear();
        store.save(&set).unwrap();
        assert!(store.load().items.is_empty());

        let leftovers: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_malformed_file_loads_empty_and_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "this is = = not toml").unwrap();

        assert_eq!(store.load(), BindingSet::default());
        assert!(!store.path().exists());
        assert!(store.path().with_extension("corrupt").exists());
    }

    #[test]
    fn test_zero_modifier_binding_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "[toggle]\nkey_code = 49\nmodifiers = 0\n").unwrap();

        assert_eq!(store.load(), BindingSet::default());
    }

    #[test]
    fn test_load_sanitizes_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut set = BindingSet::default();
        let mut a = LaunchItem::from_path("/Applications/A.app");
        a.open_hotkey = Some(chord(0, Modifiers::COMMAND));
        let mut b = LaunchItem::from_path("/Applications/B.app");
        b.open_hotkey = Some(chord(0, Modifiers::COMMAND));
        set.items.extend([a, b]);
        store.save(&set).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.items[0].open_hotkey, Some(chord(0, Modifiers::COMMAND)));
        assert_eq!(loaded.items[1].open_hotkey, None);
    }
}
