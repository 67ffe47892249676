//! # ele 子命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/ele.rs` 定义的参数
//! - 使用 `elebuilder/` 渲染

use crate::cli::ele::{BuildArgs, EleArgs, EleCommands};
use crate::elebuilder::EleDocument;
use crate::error::Result;
use crate::utils::output;

/// 执行 ele 子命令
pub fn execute(args: EleArgs) -> Result<()> {
    match args.command {
        EleCommands::Build(a) => build(a),
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let doc = EleDocument::from_toml_file(&args.input)?;
    let contents = doc.to_contents()?;
    if contents.is_empty() {
        output::print_warning("Document contains no blocks");
    }

    match &args.output {
        Some(path) => {
            contents.write(path)?;
            output::print_success(&format!(
                "{} block(s) written to '{}'",
                contents.len(),
                path.display()
            ));
        }
        None => print!("{}", contents.render()),
    }
    Ok(())
}
