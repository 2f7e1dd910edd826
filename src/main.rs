mod auction;
mod bidders;
mod logger;
mod random;
mod scenarios;
mod users;
mod utils;

use logger::{sanitize_filename, ConsoleReceiver, FileReceiver, LogEvent, Logger};
use scenarios::get_scenario_catalog;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use utils::{RAND_SEED, TOTAL_AUCTION_ROUNDS, VERBOSE_ROUND};

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();

    // Parse and filter out --verbose and --fastbreak arguments
    let mut args = Vec::new();
    let mut skip_next = false;
    let mut fastbreak = false;
    for (i, arg) in raw_args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--verbose" {
            if i + 1 < raw_args.len() && raw_args[i + 1] == "round" {
                VERBOSE_ROUND.store(true, Ordering::Relaxed);
                skip_next = true;
            }
            continue;
        }
        if arg == "--fastbreak" {
            fastbreak = true;
            continue;
        }
        args.push(arg.clone());
    }

    if args.len() > 1 {
        let scenario_arg = &args[1];

        // Parse iterations parameter if present
        let iterations = if args.len() > 2 {
            match args[2].parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!(
                        "Error: Invalid iterations parameter '{}'. Expected a number.",
                        args[2]
                    );
                    std::process::exit(1);
                }
            }
        } else {
            1
        };

        // Parse optional starting iteration index if present
        let start_iteration = if args.len() > 3 {
            match args[3].parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!(
                        "Error: Invalid start iteration parameter '{}'. Expected a number.",
                        args[3]
                    );
                    std::process::exit(1);
                }
            }
        } else {
            0
        };

        // Get all scenarios from the catalog
        let all_scenarios = get_scenario_catalog();

        // Filter scenarios: if "all", use all scenarios; otherwise filter to the named scenario
        let selected: Vec<_> = if scenario_arg == "all" {
            all_scenarios.clone()
        } else {
            let found = all_scenarios.iter().find(|s| s.short_name == scenario_arg);
            match found {
                Some(scenario) => vec![scenario.clone()],
                None => {
                    eprintln!("Error: Scenario '{}' not found.", scenario_arg);
                    eprintln!("Available scenarios:");
                    for s in &all_scenarios {
                        eprintln!("  - {}", s.short_name);
                    }
                    std::process::exit(1);
                }
            }
        };

        // Console shows validation lines; a single run of a single scenario
        // also shows its individual scenario-level checks
        let mut logger = Logger::new();
        if scenario_arg != "all" && iterations == 1 {
            logger.add_receiver(ConsoleReceiver::new(vec![
                LogEvent::Validation,
                LogEvent::Scenario,
            ]));
        } else {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
        }

        // Summary file receives the validation lines
        let summary_receiver_id = logger.add_receiver(FileReceiver::new(
            &PathBuf::from("log/summary.log"),
            vec![LogEvent::Validation],
        ));

        TOTAL_AUCTION_ROUNDS.store(0, Ordering::Relaxed);

        if iterations > 1 {
            logln!(
                &mut logger,
                LogEvent::Validation,
                "Running '{}' {} times...\n",
                scenario_arg,
                iterations
            );
        } else {
            logln!(
                &mut logger,
                LogEvent::Validation,
                "Running '{}'...\n",
                scenario_arg
            );
        }

        'scenarios: for scenario in &selected {
            log!(&mut logger, LogEvent::Validation, "{}: ", scenario.short_name);

            // Per-scenario log file with full scenario-level detail
            let scenario_receiver_id = logger.add_receiver(FileReceiver::new(
                &PathBuf::from(format!(
                    "log/{}/scenario.log",
                    sanitize_filename(scenario.short_name)
                )),
                vec![LogEvent::Scenario],
            ));

            for i in start_iteration..(start_iteration + iterations) {
                if iterations > 1 {
                    let iteration_num = i - start_iteration + 1;
                    log!(
                        &mut logger,
                        LogEvent::Validation,
                        "[{}/{}] ",
                        iteration_num,
                        iterations
                    );
                }

                // Each iteration reseeds every rng stream
                RAND_SEED.store(i, Ordering::Relaxed);

                match (scenario.run)(scenario.short_name, &mut logger) {
                    Ok(()) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✓");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✓ PASSED");
                        }
                    }
                    Err(e) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✗");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✗ FAILED: {}", e);
                        }

                        if fastbreak {
                            logger.remove_receiver(scenario_receiver_id);
                            logln!(
                                &mut logger,
                                LogEvent::Validation,
                                "\nStopping scenario execution due to failure (--fastbreak enabled)"
                            );
                            logln!(&mut logger, LogEvent::Validation, "Error at seed {}: {}", i, e);
                            break 'scenarios;
                        }
                    }
                }

                let _ = logger.flush();
            }

            logger.remove_receiver(scenario_receiver_id);
        }

        let total_rounds = TOTAL_AUCTION_ROUNDS.load(Ordering::Relaxed);
        logln!(
            &mut logger,
            LogEvent::Validation,
            "\nTotal auction rounds executed: {}",
            total_rounds
        );

        logger.remove_receiver(summary_receiver_id);
    } else {
        // Default behavior: run the random pool scenario with simulation verbosity
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![
            LogEvent::Simulation,
            LogEvent::Scenario,
            LogEvent::Validation,
        ]));
        if let Err(e) = scenarios::random_pool::run("random_pool", &mut logger) {
            eprintln!("Error running scenario: {}", e);
            std::process::exit(1);
        }
    }
}
