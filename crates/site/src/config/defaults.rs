use serde_yaml::Mapping;
use std::path::{Path, PathBuf};

const DEFAULT_GENERATOR_CONFIG: &str = r#"
title: Hexo
subtitle: ""
description: ""
keywords: []
author: ""
language: en
timezone: ""
url: http://example.com
root: /
permalink: :year/:month/:day/:title/
source_dir: source
public_dir: public
new_post_name: :title.md
default_layout: post
render_drafts: false
post_asset_folder: false
per_page: 10
pagination_dir: page
date_format: YYYY-MM-DD
time_format: HH:mm:ss
theme: landscape
"#;

/// Site config keys every generated site starts from.
pub fn default_generator_config() -> Mapping {
    serde_yaml::from_str(DEFAULT_GENERATOR_CONFIG).unwrap_or_default()
}

/// Config shipped with the generator installation.
///
/// Once a workspace has been linked into the generator directory its
/// `_config.yml` is a link and the installation's own file lives in the
/// `.bak` backup next to it.
pub fn installation_config_path(generator_dir: &Path) -> PathBuf {
    let path = generator_dir.join("_config.yml");
    let is_link = std::fs::symlink_metadata(&path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);

    if is_link {
        generator_dir.join("_config.yml.bak")
    } else {
        path
    }
}
