use slidelink_common::store::{KeyValueStore, LAST_ENDPOINT_KEY, LAST_PREFIX_KEY};
use slidelink_common::{info, success};

pub fn forget(store: &dyn KeyValueStore) -> anyhow::Result<()> {
    let had_endpoint = store.get(LAST_ENDPOINT_KEY).is_some();

    store.remove(LAST_ENDPOINT_KEY)?;
    store.remove(LAST_PREFIX_KEY)?;

    match had_endpoint {
        true => success!("Forgot the last connected host"),
        false => info!("No host was remembered"),
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use slidelink_common::store::MemoryStore;

    #[test]
    fn both_keys_are_cleared() {
        let store = MemoryStore::new();
        store.set(LAST_ENDPOINT_KEY, "192.168.1.20:10696").unwrap();
        store.set(LAST_PREFIX_KEY, "192.168.1").unwrap();
        store.set("unrelated", "kept").unwrap();

        forget(&store).unwrap();

        assert_eq!(store.get(LAST_ENDPOINT_KEY), None);
        assert_eq!(store.get(LAST_PREFIX_KEY), None);
        assert_eq!(store.get("unrelated").as_deref(), Some("kept"));
    }

    #[test]
    fn forgetting_nothing_is_fine() {
        assert!(forget(&MemoryStore::new()).is_ok());
    }
}
