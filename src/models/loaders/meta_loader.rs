use crate::error::{AppError, AppResult, FileError};
use crate::models::page::MetadataSource;
use std::io::ErrorKind;
use std::path::Path;

/// 读取单页 meta.json 原文
///
/// 不存在返回 `Absent`，其余读取失败返回 `Unreadable`，由分类器决定如何处置。
pub fn load_metadata(meta_path: &Path) -> MetadataSource {
    match std::fs::read_to_string(meta_path) {
        Ok(content) => MetadataSource::Present(content),
        Err(e) if e.kind() == ErrorKind::NotFound => MetadataSource::Absent,
        Err(e) => {
            tracing::debug!("读取失败 {}: {}", meta_path.display(), e);
            MetadataSource::Unreadable(e.to_string())
        }
    }
}

/// 读取最近处理试卷的指针文件，返回试卷目录名
pub fn read_pointer(pointer_path: &Path) -> AppResult<String> {
    let content = std::fs::read_to_string(pointer_path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            AppError::File(FileError::NotFound {
                path: pointer_path.to_path_buf(),
            })
        } else {
            AppError::file_read_failed(pointer_path, e)
        }
    })?;

    let name = content.trim();
    if name.is_empty() {
        return Err(AppError::File(FileError::NotFound {
            path: pointer_path.to_path_buf(),
        }));
    }
    Ok(name.to_string())
}
