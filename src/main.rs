use clap::{Parser as ClapParser, Subcommand};
use trellis::{
    BranchId, Runtime, RuntimeConfig, Stack, TermId,
    diagnostics::{eval_diagnostic, format_static_errors, render_eval_error},
    introspection::dump_branch,
    runtime::evaluator::trace::format_trace,
};

#[derive(ClapParser)]
#[command(name = "trellis")]
#[command(about = "Build and evaluate small trellis programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Print every evaluated term
    #[arg(long, global = true)]
    trace: bool,
    /// Print the program branch after evaluation
    #[arg(long, global = true)]
    dump: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recursive factorial through a subroutine with an early return
    Factorial {
        n: i64,
    },
    /// Sum of 0..n with a loop-carried accumulator
    Sum {
        n: i64,
    },
    /// An if/else that rebinds a name, joined after the block
    Join {
        #[arg(long)]
        flag: bool,
    },
    /// A stateful counter evaluated several times
    Counter {
        #[arg(long, default_value_t = 3)]
        times: usize,
    },
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let mut config = RuntimeConfig::from_env();
    if cli.trace {
        config.trace = true;
    }
    let mut rt = Runtime::with_config(config.clone());
    let branch = rt.new_branch();

    let (result, runs) = match cli.command {
        Commands::Factorial { n } => (build_factorial(&mut rt, branch, n), 1),
        Commands::Sum { n } => (build_sum(&mut rt, branch, n), 1),
        Commands::Join { flag } => (build_join(&mut rt, branch, flag), 1),
        Commands::Counter { times } => (build_counter(&mut rt, branch), times.max(1)),
    };

    if let Some(report) = format_static_errors(&mut rt, branch) {
        eprint!("{}", report);
        std::process::exit(1);
    }

    let mut stack = Stack::new(config);
    for _ in 0..runs {
        if let Err(err) = stack.evaluate_branch(&mut rt, branch) {
            if cli.json {
                let diagnostic = eval_diagnostic(&rt, &err);
                match serde_json::to_string_pretty(&diagnostic) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error serializing diagnostic: {}", e),
                }
            } else {
                eprintln!("{}", render_eval_error(&rt, &err));
            }
            std::process::exit(1);
        }
    }

    if cli.trace {
        eprintln!("{}", format_trace(stack.trace()));
    }
    if cli.dump {
        eprint!("{}", dump_branch(&rt, branch));
    }

    let value = rt.value_of(result);
    if cli.json {
        match serde_json::to_string(value) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing result: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", value);
    }
}

fn kernel(rt: &Runtime, name: &str) -> TermId {
    match rt.lookup(rt.kernel(), name) {
        Some(term) => term,
        None => panic!("kernel function `{}` is missing", name),
    }
}

/// `factorial(int n) -> int { if n < 2 { return 1 }; n * factorial(n - 1) }`
fn build_factorial(rt: &mut Runtime, branch: BranchId, n: i64) -> TermId {
    let int = rt.types.core().int;
    let less_than = kernel(rt, "less_than");
    let sub = kernel(rt, "sub");
    let mult = kernel(rt, "mult");

    let factorial = rt.declare_subroutine(branch, "factorial", &[("n", int)], int);
    let body = expect_graph(rt.subroutine_body(factorial));
    let arg = lookup(rt, body, "n");
    let two = rt.create_int(body, 2, None);
    let small = rt.apply(body, less_than, &[Some(arg), Some(two)], None);
    let block = rt.begin_if_block(body);
    let base = expect_graph(rt.add_if_case(block, small));
    let one = rt.create_int(base, 1, None);
    rt.create_return(base, Some(one));
    expect_graph(rt.finish_if_block(block));

    let unit = rt.create_int(body, 1, None);
    let smaller = rt.apply(body, sub, &[Some(arg), Some(unit)], None);
    let rest = rt.apply(body, factorial, &[Some(smaller)], None);
    let product = rt.apply(body, mult, &[Some(arg), Some(rest)], None);
    expect_graph(rt.finish_subroutine(factorial, Some(product)));

    let input = rt.create_int(branch, n, Some("n"));
    rt.apply(branch, factorial, &[Some(input)], Some("result"))
}

/// `total = 0; for i in range(0, n) { total = total + i }`
fn build_sum(rt: &mut Runtime, branch: BranchId, n: i64) -> TermId {
    let range = kernel(rt, "range");
    let add = kernel(rt, "add");

    let total = rt.create_int(branch, 0, Some("total"));
    let zero = rt.create_int(branch, 0, None);
    let end = rt.create_int(branch, n, None);
    let items = rt.apply(branch, range, &[Some(zero), Some(end)], Some("items"));
    let for_loop = rt.begin_for_loop(branch, "i", items);
    let body = expect_graph(rt.loop_body(for_loop));
    let i = lookup(rt, body, "i");
    rt.apply(body, add, &[Some(total), Some(i)], Some("total"));
    expect_graph(rt.finish_for_loop(for_loop, false));

    lookup(rt, branch, "total")
}

/// `x = 0; if flag { x = 1 } else { x = 2 }`
fn build_join(rt: &mut Runtime, branch: BranchId, flag: bool) -> TermId {
    rt.create_int(branch, 0, Some("x"));
    let condition = rt.create_bool(branch, flag, Some("flag"));
    let block = rt.begin_if_block(branch);
    let then = expect_graph(rt.add_if_case(block, condition));
    rt.create_int(then, 1, Some("x"));
    let otherwise = expect_graph(rt.add_else_case(block));
    rt.create_int(otherwise, 2, Some("x"));
    expect_graph(rt.finish_if_block(block));

    lookup(rt, branch, "x")
}

fn build_counter(rt: &mut Runtime, branch: BranchId) -> TermId {
    let counter = kernel(rt, "counter");
    rt.apply(branch, counter, &[], Some("count"))
}

fn lookup(rt: &Runtime, branch: BranchId, name: &str) -> TermId {
    match rt.lookup(branch, name) {
        Some(term) => term,
        None => panic!("`{}` is not bound in {}", name, branch),
    }
}

fn expect_graph<T>(result: Result<T, trellis::graph::GraphError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Error building program: {}", err);
            std::process::exit(1);
        }
    }
}
