use std::path::Path;
use sysinfo::Disks;

/// 查詢路徑所在磁碟的可用空間
pub trait SpaceProbe: Send + Sync {
    /// 無法判斷時回傳 `None`，呼叫端不應因此阻擋作業
    fn available_space(&self, path: &Path) -> Option<u64>;
}

/// 以 `sysinfo` 讀取系統磁碟清單
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpaceProbe;

impl SpaceProbe for SystemSpaceProbe {
    fn available_space(&self, path: &Path) -> Option<u64> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let disks = Disks::new_with_refreshed_list();

        // 掛載點最長者即為該路徑實際所在的磁碟
        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(sysinfo::Disk::available_space)
    }
}

/// 解壓縮前預估所需的暫存空間：壓縮檔大小的 2.5 倍
#[must_use]
pub fn estimate_extract_space(archive_size: u64) -> u64 {
    archive_size.saturating_mul(5) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_extract_space() {
        assert_eq!(estimate_extract_space(100), 250);
        assert_eq!(estimate_extract_space(0), 0);
    }

    #[test]
    fn test_system_available_space_does_not_panic() {
        let space = SystemSpaceProbe;
        let _ = space.available_space(&std::env::temp_dir());
    }
}
