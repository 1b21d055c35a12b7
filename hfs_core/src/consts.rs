//! HFS+ / HFSX 常量定义

/// 块设备物理块大小（512 字节）
pub const HFS_DEV_BSIZE: usize = 512;

/// 卷头位置（相对卷起始的字节偏移）
pub const HFS_VOLUME_HEADER_OFFSET: u64 = 1024;

/// 卷头大小
pub const HFS_VOLUME_HEADER_SIZE: usize = 512;

/// HFS+ 签名 "H+"
pub const HFS_PLUS_SIGNATURE: u16 = 0x482B;

/// HFSX 签名 "HX"
pub const HFSX_SIGNATURE: u16 = 0x4858;

/// 经典 HFS 签名 "BD"（仅用于识别，不支持解码）
pub const HFS_CLASSIC_SIGNATURE: u16 = 0x4244;

/// 每个 fork 内联存放的 extent 描述符数量
pub const HFS_INLINE_EXTENTS: usize = 8;

/// fork data 结构大小
pub const HFS_FORK_DATA_SIZE: usize = 80;

/// extent 描述符大小
pub const HFS_EXTENT_DESCRIPTOR_SIZE: usize = 8;

/// 保留的 Catalog Node ID
pub const HFS_ROOT_PARENT_ID: u32 = 1;
pub const HFS_ROOT_FOLDER_ID: u32 = 2;
pub const HFS_EXTENTS_FILE_ID: u32 = 3;
pub const HFS_CATALOG_FILE_ID: u32 = 4;
pub const HFS_BAD_BLOCKS_FILE_ID: u32 = 5;
pub const HFS_ALLOCATION_FILE_ID: u32 = 6;
pub const HFS_STARTUP_FILE_ID: u32 = 7;
pub const HFS_ATTRIBUTES_FILE_ID: u32 = 8;
pub const HFS_REPAIR_CATALOG_FILE_ID: u32 = 14;
pub const HFS_BOGUS_EXTENT_FILE_ID: u32 = 15;
pub const HFS_FIRST_USER_CATALOG_NODE_ID: u32 = 16;

/// B-tree 节点描述符大小
pub const BT_NODE_DESCRIPTOR_SIZE: usize = 14;

/// B-tree header record 大小
pub const BT_HEADER_RECORD_SIZE: usize = 106;

/// 节点类型（描述符中的 kind 字段）
pub const BT_LEAF_NODE: i8 = -1;
pub const BT_INDEX_NODE: i8 = 0;
pub const BT_HEADER_NODE: i8 = 1;
pub const BT_MAP_NODE: i8 = 2;

/// 键比较方式（header record 中的 keyCompareType）
pub const HFS_CASE_FOLDING: u8 = 0xCF;
pub const HFS_BINARY_COMPARE: u8 = 0xBC;

/// 合法的节点大小范围
pub const BT_MIN_NODE_SIZE: u16 = 512;
pub const BT_MAX_NODE_SIZE: u16 = 32768;

/// Catalog 记录类型
pub const HFS_PLUS_FOLDER_RECORD: i16 = 0x0001;
pub const HFS_PLUS_FILE_RECORD: i16 = 0x0002;
pub const HFS_PLUS_FOLDER_THREAD_RECORD: i16 = 0x0003;
pub const HFS_PLUS_FILE_THREAD_RECORD: i16 = 0x0004;

/// Catalog 记录大小
pub const HFS_PLUS_FOLDER_RECORD_SIZE: usize = 88;
pub const HFS_PLUS_FILE_RECORD_SIZE: usize = 248;

/// HFSUniStr255 最大字符数
pub const HFS_MAX_NAME_LEN: usize = 255;

/// Extents 键中的 fork 类型
pub const HFS_DATA_FORK_TYPE: u8 = 0x00;
pub const HFS_RESOURCE_FORK_TYPE: u8 = 0xFF;

/// Extents 键长度（不含 keyLength 字段本身）
pub const HFS_PLUS_EXTENT_KEY_LENGTH: u16 = 10;

/// Attributes 记录类型
pub const HFS_PLUS_ATTR_INLINE_DATA: u32 = 0x10;
pub const HFS_PLUS_ATTR_FORK_DATA: u32 = 0x20;
pub const HFS_PLUS_ATTR_EXTENTS: u32 = 0x30;

/// Attributes 键中名称之前的固定部分长度（不含 keyLength）
pub const HFS_PLUS_ATTR_KEY_FIXED_LENGTH: usize = 12;

/// HFS 时间起点（1904-01-01）与 Unix 纪元之间的秒数
pub const HFS_EPOCH_OFFSET: u32 = 2_082_844_800;

/// 默认块缓存容量（物理块数）
pub const HFS_DEFAULT_CACHE_BLOCKS: usize = 1024;

/// 默认缓存年龄上限（以缓存访问次数计）
pub const HFS_DEFAULT_CACHE_MAX_AGE: u64 = 4096;

/// 文件硬链接的 Finder 类型与创建者
pub const HFS_HARD_LINK_FILE_TYPE: [u8; 4] = *b"hlnk";
pub const HFS_HARD_LINK_CREATOR: [u8; 4] = *b"hfs+";

/// 目录硬链接的 Finder 类型与创建者
pub const HFS_DIR_LINK_FILE_TYPE: [u8; 4] = *b"fdrp";
pub const HFS_DIR_LINK_CREATOR: [u8; 4] = *b"MACS";

/// 存放文件硬链接 inode 的私有目录（根目录下）
pub const HFS_PRIVATE_DATA_DIR: &str = "\0\0\0\0HFS+ Private Data";

/// 存放目录硬链接 inode 的私有目录（根目录下）
pub const HFS_PRIVATE_DIR_DATA_DIR: &str = ".HFS+ Private Directory Data\r";

/// 私有目录中 inode 记录的名称前缀
pub const HFS_FILE_INODE_PREFIX: &str = "iNode";
pub const HFS_DIR_INODE_PREFIX: &str = "dir_";

/// 透明压缩属性名
pub const DECMPFS_XATTR_NAME: &str = "com.apple.decmpfs";

/// decmpfs 头部魔数（磁盘上为小端 "fpmc"）
pub const DECMPFS_MAGIC: u32 = 0x636D_7066;

/// decmpfs 头部大小
pub const DECMPFS_HEADER_SIZE: usize = 16;

/// 压缩数据内联在属性中（zlib）
pub const DECMPFS_TYPE_INLINE_ZLIB: u32 = 3;

/// 压缩数据在资源 fork 的 `cmpf` 资源中（zlib，分块）
pub const DECMPFS_TYPE_RESOURCE_ZLIB: u32 = 4;

/// 压缩数据的第一个字节低 4 位全 1 时，其后为未压缩的原始数据
pub const DECMPFS_RAW_MARKER: u8 = 0x0F;

/// 资源类型 `cmpf`
pub const DECMPFS_RESOURCE_TYPE: [u8; 4] = *b"cmpf";
