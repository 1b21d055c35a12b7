//! 卷头读取和验证

use super::read_fork_data;
use crate::{
    block::{BlockDev, BlockDevice},
    consts::*,
    error::{Error, ErrorKind, Result},
    types::ForkData,
};
use alloc::vec;
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};
use log::{debug, error, warn};

/// 卷类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    /// "H+"
    HfsPlus,
    /// "HX"，catalog 可能区分大小写
    Hfsx,
}

bitflags! {
    /// 卷属性
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VolumeAttributes: u32 {
        const HARDWARE_LOCK = 1 << 7;
        const UNMOUNTED = 1 << 8;
        const SPARED_BLOCKS = 1 << 9;
        const NO_CACHE_REQUIRED = 1 << 10;
        const BOOT_VOLUME_INCONSISTENT = 1 << 11;
        const CATALOG_NODE_IDS_REUSED = 1 << 12;
        const JOURNALED = 1 << 13;
        const SOFTWARE_LOCK = 1 << 15;
    }
}

/// HFS+ 卷头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHeader {
    pub kind: VolumeKind,
    pub version: u16,
    pub attributes: VolumeAttributes,
    pub last_mounted_version: u32,
    pub journal_info_block: u32,
    pub create_date: u32,
    pub modify_date: u32,
    pub backup_date: u32,
    pub checked_date: u32,
    pub file_count: u32,
    pub folder_count: u32,
    pub block_size: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub next_allocation: u32,
    pub rsrc_clump_size: u32,
    pub data_clump_size: u32,
    pub next_catalog_id: u32,
    pub write_count: u32,
    pub encodings_bitmap: u64,
    pub allocation_file: ForkData,
    pub extents_file: ForkData,
    pub catalog_file: ForkData,
    pub attributes_file: ForkData,
    pub startup_file: ForkData,
}

impl VolumeHeader {
    /// 从 512 字节的卷头解析
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Unsupported` - 经典 HFS 卷
    /// - `ErrorKind::Corrupted` - 签名或分配块大小无效
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HFS_VOLUME_HEADER_SIZE {
            return Err(Error::new(ErrorKind::Corrupted, "volume header too short"));
        }

        let signature = BigEndian::read_u16(&buf[0..2]);
        let kind = match signature {
            HFS_PLUS_SIGNATURE => VolumeKind::HfsPlus,
            HFSX_SIGNATURE => VolumeKind::Hfsx,
            HFS_CLASSIC_SIGNATURE => {
                return Err(Error::new(
                    ErrorKind::Unsupported,
                    "HFS classic volumes are not supported",
                ));
            }
            other => {
                error!("volume signature {:#06x}", other);
                return Err(Error::new(ErrorKind::Corrupted, "invalid volume signature"));
            }
        };

        let header = Self {
            kind,
            version: BigEndian::read_u16(&buf[2..4]),
            attributes: VolumeAttributes::from_bits_retain(BigEndian::read_u32(&buf[4..8])),
            last_mounted_version: BigEndian::read_u32(&buf[8..12]),
            journal_info_block: BigEndian::read_u32(&buf[12..16]),
            create_date: BigEndian::read_u32(&buf[16..20]),
            modify_date: BigEndian::read_u32(&buf[20..24]),
            backup_date: BigEndian::read_u32(&buf[24..28]),
            checked_date: BigEndian::read_u32(&buf[28..32]),
            file_count: BigEndian::read_u32(&buf[32..36]),
            folder_count: BigEndian::read_u32(&buf[36..40]),
            block_size: BigEndian::read_u32(&buf[40..44]),
            total_blocks: BigEndian::read_u32(&buf[44..48]),
            free_blocks: BigEndian::read_u32(&buf[48..52]),
            next_allocation: BigEndian::read_u32(&buf[52..56]),
            rsrc_clump_size: BigEndian::read_u32(&buf[56..60]),
            data_clump_size: BigEndian::read_u32(&buf[60..64]),
            next_catalog_id: BigEndian::read_u32(&buf[64..68]),
            write_count: BigEndian::read_u32(&buf[68..72]),
            encodings_bitmap: BigEndian::read_u64(&buf[72..80]),
            // finderInfo: 80..112
            allocation_file: read_fork_data(&buf[112..192]),
            extents_file: read_fork_data(&buf[192..272]),
            catalog_file: read_fork_data(&buf[272..352]),
            attributes_file: read_fork_data(&buf[352..432]),
            startup_file: read_fork_data(&buf[432..512]),
        };

        if !header.block_size.is_power_of_two() || header.block_size < HFS_DEV_BSIZE as u32 {
            error!("allocation block size {}", header.block_size);
            return Err(Error::new(ErrorKind::Corrupted, "invalid allocation block size"));
        }

        if header.catalog_file.logical_size == 0 {
            return Err(Error::new(ErrorKind::Corrupted, "volume has no catalog file"));
        }

        Ok(header)
    }

    /// 从块设备读取卷头（卷内偏移 1024）
    pub fn load<D: BlockDevice>(bdev: &mut BlockDev<D>) -> Result<Self> {
        let mut buf = vec![0u8; HFS_VOLUME_HEADER_SIZE];
        let n = bdev.read_bytes(HFS_VOLUME_HEADER_OFFSET, &mut buf)?;
        if n < buf.len() {
            return Err(Error::new(ErrorKind::Io, "device too small for volume header"));
        }

        let header = Self::parse(&buf)?;
        debug!(
            "volume {:?}: block_size={}, total_blocks={}, files={}, folders={}",
            header.kind, header.block_size, header.total_blocks, header.file_count, header.folder_count
        );

        if header.is_journaled() {
            warn!("volume is journaled; journal is not replayed");
        }
        if !header.attributes.contains(VolumeAttributes::UNMOUNTED) {
            warn!("volume was not cleanly unmounted");
        }

        Ok(header)
    }

    pub fn is_journaled(&self) -> bool {
        self.attributes.contains(VolumeAttributes::JOURNALED)
    }

    /// 卷总字节数
    pub fn volume_size(&self) -> u64 {
        self.total_blocks as u64 * self.block_size as u64
    }

    /// 空闲字节数
    pub fn free_bytes(&self) -> u64 {
        self.free_blocks as u64 * self.block_size as u64
    }

    pub fn has_attributes_file(&self) -> bool {
        self.attributes_file.logical_size != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(signature: u16, block_size: u32) -> [u8; HFS_VOLUME_HEADER_SIZE] {
        let mut buf = [0u8; HFS_VOLUME_HEADER_SIZE];
        BigEndian::write_u16(&mut buf[0..2], signature);
        BigEndian::write_u16(&mut buf[2..4], 4);
        BigEndian::write_u32(&mut buf[4..8], 1 << 8);
        BigEndian::write_u32(&mut buf[40..44], block_size);
        BigEndian::write_u32(&mut buf[44..48], 100);
        // catalog: 8192 字节，从块 10 开始 2 块
        BigEndian::write_u64(&mut buf[272..280], 8192);
        BigEndian::write_u32(&mut buf[288..292], 10);
        BigEndian::write_u32(&mut buf[292..296], 2);
        buf
    }

    #[test]
    fn test_parse_volume_header() {
        let header = VolumeHeader::parse(&raw_header(HFS_PLUS_SIGNATURE, 4096)).unwrap();
        assert_eq!(header.kind, VolumeKind::HfsPlus);
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.volume_size(), 409_600);
        assert_eq!(header.catalog_file.logical_size, 8192);
        assert_eq!(header.catalog_file.extents[0].start_block, 10);
        assert_eq!(header.catalog_file.extents[0].block_count, 2);
        assert!(!header.has_attributes_file());
        assert!(header.attributes.contains(VolumeAttributes::UNMOUNTED));
    }

    #[test]
    fn test_reject_bad_headers() {
        let err = VolumeHeader::parse(&raw_header(HFS_CLASSIC_SIGNATURE, 4096)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let err = VolumeHeader::parse(&raw_header(0x1234, 4096)).unwrap_err();
        assert!(err.is_corrupted());

        let err = VolumeHeader::parse(&raw_header(HFSX_SIGNATURE, 3000)).unwrap_err();
        assert!(err.is_corrupted());
    }
}
