//! CLI implementation for `sketchforge platform`

use anyhow::{Context, Result};

use crate::cli::output::{print_block, print_info, print_success};
use crate::cli::session::Session;
use crate::core::view::section_title;
use crate::core::workspace::Section;

/// List installable platforms
pub async fn list() -> Result<()> {
    let session = Session::open(false)?;
    let view = session.fabric.state().view().await?;
    print_block(
        section_title(Section::InstallMenu),
        &view.render_section(Section::InstallMenu),
    );
    session.finish().await;
    Ok(())
}

/// Install a platform version, defaulting to the newest release
pub async fn install(package: &str, platform: &str, version: Option<String>) -> Result<()> {
    let session = Session::open(false)?;
    let version = match version {
        Some(version) => version,
        None => {
            let (p, pl) = (package.to_string(), platform.to_string());
            session
                .fabric
                .state()
                .query(move |s| {
                    s.workspace
                        .catalog()
                        .package(&p)
                        .and_then(|pkg| pkg.platform(&pl))
                        .and_then(|plat| plat.versions().pop())
                })
                .await?
                .with_context(|| format!("Platform '{platform}' of '{package}' is not in any index"))?
        }
    };

    session
        .fabric
        .install_platform(package, platform, &version)
        .await
        .with_context(|| format!("Failed to install {platform} {version}"))?;
    session.finish().await;
    print_success(&format!("Processed install of {platform} {version}"));
    Ok(())
}

/// Show the documentation link of the selected platform
pub async fn docs() -> Result<()> {
    let session = Session::open(false)?;
    let url = session.fabric.state().platform_help_url().await?;
    session.finish().await;
    match url {
        Some(url) => println!("{url}"),
        None => print_info("The selected platform has no documentation link"),
    }
    Ok(())
}
