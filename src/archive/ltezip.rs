//! # `.ltezip` 晶格压缩包
//!
//! 把 `.lte` 文件及其引用的外部文件（多极误差表、尾场文件等）打包为
//! 单个 tar + zstd 归档，便于在集群之间搬运。
//!
//! ## 归档结构
//! ```text
//! ring.lte                          <- 引用已改写为 lte_suppl/... 的晶格
//! manifest.toml                     <- 归档路径 → 原始路径
//! lte_suppl/sys_mpole/Q1.MULT
//! lte_suppl/wake/rf.sdds
//! lte_suppl/misc/...
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/lte.rs` 使用
//! - 使用 `parsers/lte.rs` 和 `models/lattice.rs`

use crate::error::{ElekitError, Result};
use crate::models::lattice::FileReference;
use crate::parsers::lte::{parse_lte_content, parse_lte_file, to_lte_string};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 归档扩展名
pub const ARCHIVE_EXTENSION: &str = "ltezip";
/// 清单文件名
pub const MANIFEST_NAME: &str = "manifest.toml";
/// 附属文件根目录
pub const SUPPL_DIR: &str = "lte_suppl";

const ZSTD_LEVEL: i32 = 3;

/// 附属文件分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplCategory {
    SysMpole,
    RndMpole,
    EdgeMpole,
    SteerMpole,
    Wake,
    Misc,
}

impl SupplCategory {
    /// 按属性名归类
    pub fn from_property(name: &str) -> Self {
        let upper = name.to_uppercase();
        if upper.ends_with("MULTIPOLES") {
            if upper.starts_with("SYSTEMATIC") {
                SupplCategory::SysMpole
            } else if upper.starts_with("RANDOM") {
                SupplCategory::RndMpole
            } else if upper.contains("EDGE") {
                SupplCategory::EdgeMpole
            } else if upper.starts_with("STEERING") {
                SupplCategory::SteerMpole
            } else {
                SupplCategory::Misc
            }
        } else if upper.contains("WAKE") {
            SupplCategory::Wake
        } else {
            SupplCategory::Misc
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            SupplCategory::SysMpole => "sys_mpole",
            SupplCategory::RndMpole => "rnd_mpole",
            SupplCategory::EdgeMpole => "edge_mpole",
            SupplCategory::SteerMpole => "steer_mpole",
            SupplCategory::Wake => "wake",
            SupplCategory::Misc => "misc",
        }
    }
}

impl fmt::Display for SupplCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// 清单中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub archive_path: String,
    /// 晶格中原本写的路径
    pub original_path: String,
    pub category: String,
}

/// 归档清单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// 归档内晶格文件名
    pub lattice: String,
    pub created_by: String,
    #[serde(default, rename = "file")]
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    fn original_for(&self, archive_path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|e| e.archive_path == archive_path)
            .map(|e| e.original_path.as_str())
    }
}

/// 压缩结果
#[derive(Debug, Clone)]
pub struct ZipSummary {
    pub archive: PathBuf,
    pub stored: usize,
    /// `allow_missing` 时未找到的引用（原始写法）
    pub missing: Vec<String>,
}

/// 解压结果
#[derive(Debug, Clone)]
pub struct UnzipSummary {
    pub lattice: PathBuf,
    pub extracted: usize,
    pub restored: usize,
}

fn archive_err(path: &Path, reason: impl fmt::Display) -> ElekitError {
    ElekitError::ArchiveError {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// 默认输出路径：与输入同目录，扩展名替换为 `.ltezip`
pub fn default_archive_path(lte_path: &Path) -> PathBuf {
    lte_path.with_extension(ARCHIVE_EXTENSION)
}

/// 在分类目录内为文件分配不冲突的名称
fn unique_archive_path(category: SupplCategory, source: &Path, taken: &mut HashSet<String>) -> String {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let stem = source
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());
    let ext = source.extension().map(|e| e.to_string_lossy().into_owned());

    let mut candidate = format!("{}/{}/{}", SUPPL_DIR, category.dir_name(), file_name);
    let mut n = 1;
    while taken.contains(&candidate) {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        candidate = format!("{}/{}/{}", SUPPL_DIR, category.dir_name(), name);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn append_text<W: Write>(builder: &mut tar::Builder<W>, name: &str, text: &str) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(text.len() as u64);
    header.set_mode(0o644);
    builder.append_data(&mut header, name, text.as_bytes())
}

/// 先写入同目录下的临时文件，成功后再改名为 `output`；失败时不留下半成品
fn write_atomic<F>(output: &Path, write: F) -> Result<()>
where
    F: FnOnce(&File) -> Result<()>,
{
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ElekitError::FileWriteError {
        path: output.display().to_string(),
        source: e,
    })?;
    write(tmp.as_file())?;
    tmp.persist(output).map_err(|e| ElekitError::FileWriteError {
        path: output.display().to_string(),
        source: e.error,
    })?;
    Ok(())
}

/// 压缩晶格及其引用文件
pub fn zip_lte(lte_path: &Path, output: &Path, allow_missing: bool) -> Result<ZipSummary> {
    let mut lattice = parse_lte_file(lte_path)?;
    let base_dir = lte_path.parent().unwrap_or_else(|| Path::new("."));

    // 原始写法 → 归档路径；同一源文件只存一份
    let mut mapping: HashMap<String, String> = HashMap::new();
    let mut by_source: HashMap<PathBuf, String> = HashMap::new();
    let mut taken = HashSet::new();
    let mut sources: Vec<(PathBuf, ManifestEntry)> = Vec::new();
    let mut missing = Vec::new();

    for FileReference { property, path, .. } in lattice.file_references() {
        if mapping.contains_key(&path) || missing.contains(&path) {
            continue;
        }
        let source = base_dir.join(&path);
        if !source.is_file() {
            if allow_missing {
                warn!(file = %path, "referenced file not found, leaving reference unchanged");
                missing.push(path);
                continue;
            }
            return Err(ElekitError::FileNotFound {
                path: source.display().to_string(),
            });
        }
        let key = fs::canonicalize(&source).unwrap_or_else(|_| source.clone());
        if let Some(existing) = by_source.get(&key) {
            mapping.insert(path, existing.clone());
            continue;
        }

        let category = SupplCategory::from_property(&property);
        let archive_path = unique_archive_path(category, &source, &mut taken);
        debug!(from = %path, to = %archive_path, "archiving referenced file");
        by_source.insert(key, archive_path.clone());
        mapping.insert(path.clone(), archive_path.clone());
        sources.push((
            source,
            ManifestEntry {
                archive_path,
                original_path: path,
                category: category.to_string(),
            },
        ));
    }

    lattice.rewrite_file_references(|r| mapping.get(&r.path).cloned());

    let lattice_name = lte_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lattice.lte".to_string());
    let manifest = Manifest {
        lattice: lattice_name.clone(),
        created_by: format!("elekit {}", env!("CARGO_PKG_VERSION")),
        files: sources.iter().map(|(_, e)| e.clone()).collect(),
    };
    let manifest_text = toml::to_string_pretty(&manifest)?;

    let lattice_text = to_lte_string(&lattice);
    write_atomic(output, |file| {
        let encoder =
            zstd::Encoder::new(BufWriter::new(file), ZSTD_LEVEL).map_err(|e| archive_err(output, e))?;
        let mut builder = tar::Builder::new(encoder);

        append_text(&mut builder, &lattice_name, &lattice_text).map_err(|e| archive_err(output, e))?;
        append_text(&mut builder, MANIFEST_NAME, &manifest_text).map_err(|e| archive_err(output, e))?;
        for (source, entry) in &sources {
            builder
                .append_path_with_name(source, &entry.archive_path)
                .map_err(|e| archive_err(source, e))?;
        }

        let encoder = builder.into_inner().map_err(|e| archive_err(output, e))?;
        let mut writer = encoder.finish().map_err(|e| archive_err(output, e))?;
        writer.flush().map_err(|e| archive_err(output, e))
    })?;

    info!(archive = %output.display(), files = sources.len(), "lattice archived");
    Ok(ZipSummary {
        archive: output.to_path_buf(),
        stored: sources.len(),
        missing,
    })
}

/// 读取归档内的清单（不解压其他文件）
pub fn read_manifest(archive: &Path) -> Result<Manifest> {
    let file = File::open(archive).map_err(|e| ElekitError::FileReadError {
        path: archive.display().to_string(),
        source: e,
    })?;
    let decoder = zstd::Decoder::new(BufReader::new(file)).map_err(|e| archive_err(archive, e))?;
    let mut tar = tar::Archive::new(decoder);

    for entry in tar.entries().map_err(|e| archive_err(archive, e))? {
        let mut entry = entry.map_err(|e| archive_err(archive, e))?;
        let is_manifest = entry
            .path()
            .map(|p| p == Path::new(MANIFEST_NAME))
            .unwrap_or(false);
        if is_manifest {
            let mut text = String::new();
            entry.read_to_string(&mut text).map_err(|e| archive_err(archive, e))?;
            return Ok(toml::from_str(&text)?);
        }
    }
    Err(archive_err(archive, format!("missing {}", MANIFEST_NAME)))
}

/// 解压归档；`restore_paths` 时把晶格中的引用改回原始路径
pub fn unzip_lte(archive: &Path, dest: &Path, restore_paths: bool) -> Result<UnzipSummary> {
    let file = File::open(archive).map_err(|e| ElekitError::FileReadError {
        path: archive.display().to_string(),
        source: e,
    })?;
    fs::create_dir_all(dest).map_err(|e| ElekitError::FileWriteError {
        path: dest.display().to_string(),
        source: e,
    })?;

    let decoder = zstd::Decoder::new(BufReader::new(file)).map_err(|e| archive_err(archive, e))?;
    let mut tar = tar::Archive::new(decoder);
    let mut extracted = 0;

    for entry in tar.entries().map_err(|e| archive_err(archive, e))? {
        let mut entry = entry.map_err(|e| archive_err(archive, e))?;
        // unpack_in 拒绝包含 `..` 或绝对路径的条目
        let unpacked = entry.unpack_in(dest).map_err(|e| archive_err(archive, e))?;
        if unpacked {
            extracted += 1;
        } else {
            let name = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
            warn!(entry = %name, "skipped archive entry outside destination");
        }
    }

    let manifest_path = dest.join(MANIFEST_NAME);
    let manifest_text = fs::read_to_string(&manifest_path).map_err(|e| ElekitError::FileReadError {
        path: manifest_path.display().to_string(),
        source: e,
    })?;
    let manifest: Manifest = toml::from_str(&manifest_text)?;
    let lattice_path = dest.join(&manifest.lattice);

    let mut restored = 0;
    if restore_paths {
        let text = fs::read_to_string(&lattice_path).map_err(|e| ElekitError::FileReadError {
            path: lattice_path.display().to_string(),
            source: e,
        })?;
        let mut lattice = parse_lte_content(&text)?;
        restored = lattice.rewrite_file_references(|r| manifest.original_for(&r.path).map(str::to_string));
        fs::write(&lattice_path, to_lte_string(&lattice)).map_err(|e| ElekitError::FileWriteError {
            path: lattice_path.display().to_string(),
            source: e,
        })?;
        debug!(restored, "restored original file references");
    }

    Ok(UnzipSummary {
        lattice: lattice_path,
        extracted,
        restored,
    })
}
