//! 实验组的文件枚举与逐文件统计量聚合。

use super::welford::{GroupStatistics, MomentAccumulator};
use crate::error::{Error, Result};
use crate::volume::Volume;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 一个实验组：目录及文件名后缀过滤条件。
#[derive(Clone, Debug)]
pub struct GroupSpec {
    pub dir: PathBuf,
    pub suffix: String,
}

impl GroupSpec {
    #[inline]
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, suffix: S) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    /// 目录名，用于构造默认输出文件名。
    pub fn dir_name(&self) -> String {
        self.dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// 按路径排序列出目录（不递归）下所有以`suffix`结尾的常规文件。
    ///
    /// 目录不存在时返回`Error::NotADirectory`，没有匹配文件时返回`Error::EmptyGroup`。
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(Error::NotADirectory(self.dir.clone()));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(self.dir.as_path())
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("目录遍历失败"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matched = entry
                .file_name()
                .to_str()
                .map_or(false, |name| name.ends_with(self.suffix.as_str()));
            if matched {
                files.push(entry.into_path());
            }
        }
        if files.is_empty() {
            return Err(Error::EmptyGroup {
                dir: self.dir.clone(),
                suffix: self.suffix.clone(),
            });
        }
        Ok(files)
    }
}

/// 一个实验组聚合后的结果。
#[derive(Clone, Debug)]
pub struct AggregatedGroup {
    pub stats: GroupStatistics,
    pub files: Vec<PathBuf>,
    /// 第一个文件的体素间距。
    pub spacing: Option<Vec<f64>>,
}

/// 逐个读取`spec`匹配的文件并折叠进一个新的累加器。
pub fn aggregate(spec: &GroupSpec) -> Result<AggregatedGroup> {
    let files = spec.files()?;
    log::info!(
        "在`{}`中找到{}个后缀为`{}`的文件",
        spec.dir.display(),
        files.len(),
        spec.suffix
    );

    let mut acc: Option<MomentAccumulator> = None;
    let mut spacing = None;
    for path in files.iter() {
        let volume = load_checked(path, acc.as_ref().map(|a| a.shape()))?;
        let acc = acc.get_or_insert_with(|| {
            spacing = volume.spacing().map(<[f64]>::to_vec);
            MomentAccumulator::new(volume.shape())
        });
        acc.update(volume.data())?;
        log::debug!("已累加 {} ({}/{})", path.display(), acc.count(), files.len());
    }

    // `files`非空，循环至少执行一次。
    let stats = match acc {
        Some(acc) => acc.finalize(),
        None => {
            return Err(Error::EmptyGroup {
                dir: spec.dir.clone(),
                suffix: spec.suffix.clone(),
            })
        }
    };
    Ok(AggregatedGroup {
        stats,
        files,
        spacing,
    })
}

/// 读取体数据，并在给出`expected`时检查形状。
pub(crate) fn load_checked(path: &Path, expected: Option<&[usize]>) -> Result<Volume> {
    let volume = Volume::open(path)?;
    match expected {
        Some(shape) if shape != volume.shape() => {
            Err(Error::shape_mismatch(path, shape, volume.shape()))
        }
        _ => Ok(volume),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::fs;

    fn write_const(dir: &Path, name: &str, shape: (usize, usize, usize), value: f32) {
        let a = Array3::<f32>::from_elem(shape, value);
        ndarray_npy::write_npy(dir.join(name), &a).unwrap();
    }

    #[test]
    fn test_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_const(dir.path(), "b_density_map.npy", (2, 2, 2), 1.0);
        write_const(dir.path(), "a_density_map.npy", (2, 2, 2), 1.0);
        write_const(dir.path(), "c_binary.npy", (2, 2, 2), 1.0);
        fs::create_dir(dir.path().join("sub_density_map.npy")).unwrap();

        let spec = GroupSpec::new(dir.path(), "_density_map.npy");
        let files = spec.files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["a_density_map.npy", "b_density_map.npy"]);
    }

    #[test]
    fn test_empty_group_and_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_const(dir.path(), "x.npy", (1, 1, 1), 0.0);
        let spec = GroupSpec::new(dir.path(), ".nrrd");
        assert!(matches!(aggregate(&spec), Err(Error::EmptyGroup { .. })));

        let spec = GroupSpec::new(dir.path().join("nope"), ".npy");
        assert!(matches!(spec.files(), Err(Error::NotADirectory(_))));
    }

    #[test]
    fn test_aggregate_mean_and_variance() {
        let dir = tempfile::tempdir().unwrap();
        for (i, v) in [1.0, 2.0, 6.0].into_iter().enumerate() {
            write_const(dir.path(), &format!("{i}.npy"), (3, 2, 2), v);
        }
        let group = aggregate(&GroupSpec::new(dir.path(), ".npy")).unwrap();
        assert_eq!(group.stats.count(), 3);
        assert_eq!(group.files.len(), 3);
        assert!(group.stats.mean().iter().all(|&m| (m - 3.0).abs() < 1e-12));
        assert!(group.stats.variance().iter().all(|&v| (v - 7.0).abs() < 1e-12));
    }

    #[test]
    fn test_shape_mismatch_names_offending_file() {
        let dir = tempfile::tempdir().unwrap();
        write_const(dir.path(), "0.npy", (4, 4, 4), 1.0);
        write_const(dir.path(), "1.npy", (4, 4, 5), 1.0);
        match aggregate(&GroupSpec::new(dir.path(), ".npy")) {
            Err(Error::ShapeMismatch {
                origin,
                expected,
                found,
            }) => {
                assert!(origin.ends_with("1.npy"));
                assert_eq!(expected, vec![4, 4, 4]);
                assert_eq!(found, vec![4, 4, 5]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
