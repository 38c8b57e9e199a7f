use crate::cli::BootstrapArgs;

pub fn run(args: BootstrapArgs) -> anyhow::Result<()> {
    let (project, session) = crate::open(&args.conn)?;
    let path = project.resolve_path(&args.file);

    let count = session.run(|s| pgcrud::run_sql_file(s, &path))?;
    println!("{}: {count} statement(s) applied", path.display());
    Ok(())
}
