use anyhow::Result;
use clap::Parser;

mod animation;
mod assets;
mod camera;
mod config;
mod demo;
mod gui;
mod lights;
mod model;
mod orbit;
mod rendering;
mod scene_graph;
mod viewer;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = config::Args::parse();
    pollster::block_on(window::run(args.into()))?;

    Ok(())
}
