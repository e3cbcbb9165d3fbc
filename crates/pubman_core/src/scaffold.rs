//! Production folder hierarchy scaffolding.
//!
//! # Responsibility
//! - Create the fixed production hierarchy under a new root folder.
//! - Copy a template hierarchy into a project directory.

use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Folders created below a new production root, parents implied.
pub const PRODUCTION_FOLDERS: [&str; 58] = [
    "01_Project_Data/01_StoryBoard_and_Script",
    "01_Project_Data/02_References",
    "01_Project_Data/03_Work_Material/01_Images",
    "01_Project_Data/03_Work_Material/02_Footage",
    "01_Project_Data/03_Work_Material/03_Audio",
    "01_Project_Data/03_Work_Material/04_Models",
    "01_Project_Data/04_Calendar",
    "01_Project_Data/05_Cam_Info",
    "01_Project_Data/06_Feedback",
    "02_2D_Projects/01_PSD",
    "02_2D_Projects/02_Illustrator",
    "3D_Project/01_Softwares/01_Max/01_Pre-Prod/01_RND",
    "3D_Project/01_Softwares/01_Max/01_Pre-Prod/02_Models",
    "3D_Project/01_Softwares/01_Max/01_Pre-Prod/03_Rigging",
    "3D_Project/01_Softwares/01_Max/01_Pre-Prod/04_Lookdev",
    "3D_Project/01_Softwares/01_Max/01_Pre-Prod/05_Render",
    "3D_Project/01_Softwares/01_Max/02_Prod/01_Scenes/Shot_Structure/Anim",
    "3D_Project/01_Softwares/01_Max/02_Prod/01_Scenes/Shot_Structure/Render_Scenes",
    "3D_Project/01_Softwares/01_Max/02_Prod/02_Render/Shot_Structure",
    "3D_Project/01_Softwares/01_Max/03_Sims",
    "3D_Project/01_Softwares/01_Max/04_Matlibs",
    "3D_Project/01_Softwares/02_Maya/01_Pre-Prod/01_RND",
    "3D_Project/01_Softwares/02_Maya/01_Pre-Prod/02_Models",
    "3D_Project/01_Softwares/02_Maya/01_Pre-Prod/03_Rigging",
    "3D_Project/01_Softwares/02_Maya/01_Pre-Prod/04_Lookdev",
    "3D_Project/01_Softwares/02_Maya/01_Pre-Prod/05_Render",
    "3D_Project/01_Softwares/02_Maya/02_Prod/01_Scenes/Shot_Structure/Anim",
    "3D_Project/01_Softwares/02_Maya/02_Prod/01_Scenes/Shot_Structure/Render_Scenes",
    "3D_Project/01_Softwares/02_Maya/02_Prod/02_Renders/Shot_Structure",
    "3D_Project/01_Softwares/03_Houdini/01_Pre-prod/01_Scenes",
    "3D_Project/01_Softwares/03_Houdini/01_Pre-prod/02_Collect",
    "3D_Project/01_Softwares/03_Houdini/01_Pre-prod/03_Renders",
    "3D_Project/01_Softwares/03_Houdini/02_Prod/01_Scenes",
    "3D_Project/01_Softwares/03_Houdini/02_Prod/02_Collect",
    "3D_Project/01_Softwares/03_Houdini/02_Prod/03_Renders",
    "3D_Project/01_Softwares/04_Unreal/01_Scenes/Shot_Structure",
    "3D_Project/01_Softwares/04_Unreal/02_Render/Shot_Structure",
    "3D_Project/01_Softwares/05_ZBrush/01_Scenes",
    "3D_Project/01_Softwares/05_ZBrush/02_Work_Images",
    "3D_Project/01_Softwares/06_Substance/01_Scenes",
    "3D_Project/01_Softwares/06_Substance/02_Work_Images",
    "3D_Project/02_Export/01_Assets",
    "3D_Project/02_Export/02_Shots/Shot_Structure",
    "3D_Project/03_Capture/01_Pre-prod",
    "3D_Project/03_Capture/02_Prod/Shot_Structure",
    "3D_Project/04_Textures",
    "04_Tracking/01_PFTrack",
    "04_Tracking/02_AE",
    "04_Tracking/03_C4D",
    "04_Tracking/004_SynthEyes",
    "04_Tracking/005_PFTrack",
    "05_Compositing/01_Comp_Scenes/01_Slate",
    "05_Compositing/02_PreComp_Renders",
    "05_Compositing/03_Comp_Renders",
    "05_Compositing/04_Edit/Output",
    "05_Compositing/04_Edit/Work",
    "06_Internal_Review",
    "07_Out_To_Client",
];

pub type ScaffoldResult<T> = Result<T, ScaffoldError>;

#[derive(Debug)]
pub enum ScaffoldError {
    /// Root folder name is blank.
    EmptyName,
    /// Target root already exists.
    AlreadyExists(PathBuf),
    /// Template directory is missing or not a directory.
    TemplateNotFound(PathBuf),
    Io { path: PathBuf, source: io::Error },
    Walk(walkdir::Error),
}

impl Display for ScaffoldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "root folder name must not be empty"),
            Self::AlreadyExists(path) => write!(f, "`{}` already exists", path.display()),
            Self::TemplateNotFound(path) => {
                write!(f, "template directory not found: `{}`", path.display())
            }
            Self::Io { path, source } => write!(f, "cannot create `{}`: {source}", path.display()),
            Self::Walk(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScaffoldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Walk(err) => Some(err),
            _ => None,
        }
    }
}

impl From<walkdir::Error> for ScaffoldError {
    fn from(value: walkdir::Error) -> Self {
        Self::Walk(value)
    }
}

/// Creates `parent/name` and every entry of [`PRODUCTION_FOLDERS`] below it.
///
/// Returns the root followed by each listed folder, in list order.
pub fn create_production_structure(parent: &Path, name: &str) -> ScaffoldResult<Vec<PathBuf>> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ScaffoldError::EmptyName);
    }
    let root = parent.join(name);
    if root.exists() {
        return Err(ScaffoldError::AlreadyExists(root));
    }

    let mut created = Vec::with_capacity(PRODUCTION_FOLDERS.len() + 1);
    create_dir(&root)?;
    created.push(root.clone());
    for folder in PRODUCTION_FOLDERS {
        let path = root.join(folder);
        create_dir(&path)?;
        created.push(path);
    }

    info!(
        "event=scaffold_create module=scaffold status=ok root={} folders={}",
        root.display(),
        created.len()
    );
    Ok(created)
}

/// Copies every folder and file of `template` into `target`, merging with
/// existing folders and overwriting files of the same name.
///
/// Returns the number of copied files.
pub fn copy_template(template: &Path, target: &Path) -> ScaffoldResult<usize> {
    if !template.is_dir() {
        return Err(ScaffoldError::TemplateNotFound(template.to_path_buf()));
    }
    create_dir(target)?;

    let mut copied = 0;
    for entry in WalkDir::new(template).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(template) else {
            continue;
        };
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            create_dir(&destination)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &destination).map_err(|source| ScaffoldError::Io {
                path: destination.clone(),
                source,
            })?;
            copied += 1;
        }
    }

    info!(
        "event=scaffold_template module=scaffold status=ok template={} target={} files={copied}",
        template.display(),
        target.display()
    );
    Ok(copied)
}

fn create_dir(path: &Path) -> ScaffoldResult<()> {
    fs::create_dir_all(path).map_err(|source| {
        error!(
            "event=scaffold_create module=scaffold status=error path={} error={source}",
            path.display()
        );
        ScaffoldError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::PRODUCTION_FOLDERS;
    use std::collections::HashSet;

    #[test]
    fn folder_list_has_no_duplicates() {
        let unique = PRODUCTION_FOLDERS.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), PRODUCTION_FOLDERS.len());
    }

    #[test]
    fn folder_list_is_relative() {
        assert!(PRODUCTION_FOLDERS
            .iter()
            .all(|folder| !folder.starts_with('/') && !folder.contains("..")));
    }
}
