use crate::cli::CompileArgs;

pub fn run(args: CompileArgs) -> anyhow::Result<()> {
    print!("{}", render(&args)?);
    Ok(())
}

fn render(args: &CompileArgs) -> anyhow::Result<String> {
    let stmt = dbbind::compile(&args.sql, args.style)?;
    let mut out = format!("{}\n", stmt.sql());
    out.push_str(&format!("keys: [{}]\n", stmt.keys().join(", ")));
    if stmt.bind_keys() != stmt.keys() {
        out.push_str(&format!("binds: [{}]\n", stmt.bind_keys().join(", ")));
    }
    Ok(out)
}
