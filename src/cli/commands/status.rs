//! CLI implementation for `sketchforge status`

use anyhow::Result;

use crate::cli::output::print_block;
use crate::cli::session::Session;
use crate::core::view::section_title;
use crate::core::workspace::Section;

const STATUS_SECTIONS: [Section; 7] = [
    Section::Platforms,
    Section::Versions,
    Section::Boards,
    Section::BoardOptions,
    Section::Programmers,
    Section::SerialPorts,
    Section::Language,
];

/// Execute the status command
pub async fn execute() -> Result<()> {
    let session = Session::open(false)?;
    let view = session.fabric.state().view().await?;
    for section in STATUS_SECTIONS {
        print_block(section_title(section), &view.render_section(section));
    }
    session.finish().await;
    Ok(())
}
