//! Material libraries and the textures they reference.

use std::path::{Component, Path};

use crate::error::{TilerError, TilerResult};

/// MTL statements whose last argument is a texture file.
const TEXTURE_STATEMENTS: &[&str] = &[
    "map_Ka", "map_Kd", "map_Ks", "map_Ke", "map_Ns", "map_d", "map_bump", "bump", "disp",
    "decal", "norm",
];

/// Unique texture files referenced by an MTL file, in order of appearance.
///
/// Options before the file name (such as `-s 1 1 1`) are skipped by taking
/// the last argument.
pub fn texture_files(mtl: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in mtl.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        if !TEXTURE_STATEMENTS.contains(&keyword) {
            continue;
        }
        let Some(file) = tokens.last() else {
            continue;
        };
        if !files.iter().any(|known| known == file) {
            files.push(file.to_string());
        }
    }
    files
}

/// Copy the material libraries of a model and their textures to `output`.
///
/// Returns the number of files copied.
pub fn copy_materials(
    input_dir: &Path,
    material_libraries: &[String],
    output: &Path,
) -> TilerResult<usize> {
    let mut copied = 0;
    for library in material_libraries {
        if !is_contained(library) {
            tracing::warn!("Skipping material library outside the model directory: {library}");
            continue;
        }
        let source = input_dir.join(library);
        let text = std::fs::read_to_string(&source).map_err(|e| TilerError::io(&source, &e))?;
        copy_file(&source, &output.join(library))?;
        copied += 1;

        for texture in texture_files(&text) {
            if !is_contained(&texture) {
                tracing::warn!("Skipping texture outside the model directory: {texture}");
                continue;
            }
            copy_file(&input_dir.join(&texture), &output.join(&texture))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Whether `path` is relative and stays below the directory it is joined to.
fn is_contained(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn copy_file(source: &Path, destination: &Path) -> TilerResult<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TilerError::io(parent, &e))?;
    }
    std::fs::copy(source, destination).map_err(|e| TilerError::io(source, &e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_files() {
        let mtl = "\
newmtl brick
Kd 1 1 1
map_Kd textures/brick.png
map_bump -bm 0.5 textures/brick_n.png
newmtl wall
map_Kd textures/brick.png # shared
";
        assert_eq!(
            texture_files(mtl),
            vec![
                "textures/brick.png".to_string(),
                "textures/brick_n.png".to_string()
            ]
        );
    }

    #[test]
    fn test_copy_materials() {
        let root = std::env::temp_dir().join(format!("mesh-tiler-textures-{}", std::process::id()));
        let input = root.join("in");
        let output = root.join("out");
        std::fs::create_dir_all(input.join("tex")).unwrap();
        std::fs::write(input.join("model.mtl"), "newmtl a\nmap_Kd tex/a.png\n").unwrap();
        std::fs::write(input.join("tex/a.png"), b"png").unwrap();

        let copied = copy_materials(&input, &["model.mtl".to_string()], &output).unwrap();
        assert_eq!(copied, 2);
        assert!(output.join("model.mtl").exists());
        assert_eq!(std::fs::read(output.join("tex/a.png")).unwrap(), b"png");

        std::fs::write(
            input.join("escape.mtl"),
            "newmtl b\nmap_Kd ../outside.png\nmap_Ks /etc/abs.png\nmap_Kd tex/a.png\n",
        )
        .unwrap();
        let copied = copy_materials(
            &input,
            &["escape.mtl".to_string(), "../model.mtl".to_string()],
            &output,
        )
        .unwrap();
        assert_eq!(copied, 2);
        assert!(!root.join("outside.png").exists());

        let missing = copy_materials(&input, &["missing.mtl".to_string()], &output);
        assert!(matches!(missing, Err(TilerError::Io { .. })));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
