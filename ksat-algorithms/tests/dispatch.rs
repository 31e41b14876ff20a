use ksat_algorithms::satisfiability::{solve_challenge, Algorithm};
use ksat_algorithms::Error;
use ksat_challenges::satisfiability::{Difficulty, Formula};
use serde_json::{json, Map, Value};

fn hyperparameters(value: Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

#[test]
fn test_algorithm_names() {
    assert_eq!("hc".parse::<Algorithm>().unwrap(), Algorithm::HillClimbing);
    assert_eq!(
        "hill_climbing".parse::<Algorithm>().unwrap(),
        Algorithm::HillClimbing
    );
    assert_eq!(
        "beam".parse::<Algorithm>().unwrap(),
        Algorithm::BeamSearch { beam_width: None }
    );
    assert_eq!(
        "beam4".parse::<Algorithm>().unwrap(),
        Algorithm::BeamSearch {
            beam_width: Some(4)
        }
    );
    assert_eq!("vnd".parse::<Algorithm>().unwrap(), Algorithm::Vnd);
    assert_eq!("beam3".parse::<Algorithm>().unwrap().to_string(), "beam3");
    for name in ["", "dpll", "beamx", "beam-3", "VND"] {
        assert!(matches!(
            name.parse::<Algorithm>(),
            Err(Error::UnknownAlgorithm(_))
        ));
    }
}

#[test]
fn test_every_algorithm_returns_a_consistent_outcome() {
    let formula = Formula::generate_instance(3, &Difficulty::new(3, 20, 85)).unwrap();
    for name in ["hc", "beam3", "beam4", "vnd"] {
        let outcome = solve_challenge(&formula, name, 3, &None).unwrap();
        assert_eq!(outcome.assignment.num_variables(), 20);
        assert!(outcome.score <= 85);
        assert_eq!(outcome.score, formula.evaluate(&outcome.assignment).unwrap());

        let again = solve_challenge(&formula, name, 3, &None).unwrap();
        assert_eq!(outcome.assignment, again.assignment);
        assert_eq!(outcome.score, again.score);
    }
}

#[test]
fn test_hyperparameters_are_applied() {
    let formula = Formula::generate_instance(4, &Difficulty::new(3, 20, 85)).unwrap();
    let outcome = solve_challenge(
        &formula,
        "beam",
        4,
        &hyperparameters(json!({ "beam_width": 2, "max_iters": 3 })),
    )
    .unwrap();
    assert!(outcome.stats.iterations <= 3);

    let outcome = solve_challenge(
        &formula,
        "hc",
        4,
        &hyperparameters(json!({ "max_iters": 1, "restarts": 2 })),
    )
    .unwrap();
    assert!(outcome.stats.iterations <= 2);
}

#[test]
fn test_parameter_misuse_is_an_error() {
    let formula = Formula::generate_instance(5, &Difficulty::new(3, 10, 42)).unwrap();
    assert!(matches!(
        solve_challenge(&formula, "beam0", 0, &None),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        solve_challenge(
            &formula,
            "beam",
            0,
            &hyperparameters(json!({ "beam_width": 0 }))
        ),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        solve_challenge(&formula, "vnd", 0, &hyperparameters(json!({ "max_iters": 0 }))),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        solve_challenge(&formula, "hc", 0, &hyperparameters(json!({ "restart": 3 }))),
        Err(Error::Hyperparameters(_))
    ));
    assert!(matches!(
        solve_challenge(&formula, "hc", 0, &hyperparameters(json!({ "restarts": -1 }))),
        Err(Error::Hyperparameters(_))
    ));
    assert!(matches!(
        solve_challenge(&formula, "walksat", 0, &None),
        Err(Error::UnknownAlgorithm(_))
    ));
}
