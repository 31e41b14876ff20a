use ksat_challenges::satisfiability::{Assignment, Clause, Difficulty, Formula, Literal};
use ksat_challenges::Error;
use std::collections::HashSet;

fn two_clause_formula() -> Formula {
    Formula::new(4, vec![vec![1, -2, 3].into(), vec![-1, 2, 4].into()]).unwrap()
}

#[test]
fn test_generated_clauses_have_k_distinct_variables() {
    for (seed, k, n, m) in [(0, 3, 10, 42), (7, 1, 1, 5), (3, 5, 5, 20), (11, 4, 50, 210)] {
        let formula = Formula::generate_instance(seed, &Difficulty::new(k, n, m)).unwrap();
        assert_eq!(formula.num_clauses(), m);
        assert_eq!(formula.num_variables(), n);
        for clause in formula.clauses() {
            assert_eq!(clause.len(), k);
            let vars: HashSet<usize> = clause.iter().map(Literal::variable).collect();
            assert_eq!(vars.len(), k);
            assert!(vars.iter().all(|&v| (1..=n).contains(&v)));
        }
    }
}

#[test]
fn test_generation_is_deterministic() {
    let difficulty = Difficulty::new(3, 20, 85);
    let a = Formula::generate_instance(42, &difficulty).unwrap();
    let b = Formula::generate_instance(42, &difficulty).unwrap();
    assert_eq!(a, b);
    let c = Formula::generate_instance(43, &difficulty).unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_generation_uses_both_polarities() {
    let formula = Formula::generate_instance(5, &Difficulty::new(3, 30, 100)).unwrap();
    let positives = formula
        .clauses()
        .iter()
        .flat_map(Clause::iter)
        .filter(|l| l.is_positive())
        .count();
    assert!(positives > 0 && positives < 300);
}

#[test]
fn test_zero_clauses_is_allowed() {
    let formula = Formula::generate_instance(1, &Difficulty::new(3, 3, 0)).unwrap();
    assert_eq!(formula.num_clauses(), 0);
    assert_eq!(formula.clause_size(), None);
    assert_eq!(formula.to_string(), "");
}

#[test]
fn test_invalid_parameters() {
    for difficulty in [
        Difficulty::new(4, 3, 10),
        Difficulty::new(0, 3, 10),
        Difficulty::new(3, 0, 10),
    ] {
        assert!(matches!(
            Formula::generate_instance(0, &difficulty),
            Err(Error::InvalidParameter(_))
        ));
    }
    assert!(matches!(
        Difficulty::try_from(vec![3, 10, -1]),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        Difficulty::try_from(vec![-3, 10, 5]),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        Difficulty::try_from(vec![3, 10]),
        Err(Error::InvalidParameter(_))
    ));
    assert_eq!(
        Difficulty::try_from(vec![3, 10, 42]).unwrap(),
        Difficulty::new(3, 10, 42)
    );
}

#[test]
fn test_all_true_satisfies_both_clauses() {
    let formula = two_clause_formula();
    let assignment = Assignment::all(4, true);
    assert_eq!(formula.evaluate(&assignment).unwrap(), 2);
    assert!(formula.verify_assignment(&assignment).is_ok());
}

#[test]
fn test_verify_reports_first_unsatisfied_clause() {
    let formula = two_clause_formula();
    let assignment = Assignment::new(vec![true, true, false, false]);
    assert_eq!(formula.evaluate(&assignment).unwrap(), 2);
    let assignment = Assignment::new(vec![false, true, false, false]);
    assert_eq!(formula.evaluate(&assignment).unwrap(), 1);
    assert!(matches!(
        formula.verify_assignment(&assignment),
        Err(Error::Unsatisfied { clause: 0 })
    ));
    assert!(matches!(
        formula.evaluate(&Assignment::all(3, true)),
        Err(Error::AssignmentSize {
            expected: 4,
            actual: 3
        })
    ));
}

#[test]
fn test_format_and_parse() {
    let formula = two_clause_formula();
    assert_eq!(formula.to_string(), "[1,-2,3] [-1,2,4]");
    assert_eq!(Formula::parse(4, "[1,-2,3] [-1,2,4]").unwrap(), formula);
    assert_eq!(Formula::parse(4, " [1, -2, 3][-1, 2,4] ").unwrap(), formula);

    let generated = Formula::generate_instance(9, &Difficulty::new(3, 12, 30)).unwrap();
    assert_eq!(
        Formula::parse(12, &generated.to_string()).unwrap(),
        generated
    );
}

#[test]
fn test_malformed_formulas_are_rejected() {
    for (n, text) in [
        (3, "[1,1,2]"),
        (3, "[1,-1,2]"),
        (3, "[1,2,4]"),
        (3, "[0,1,2]"),
        (3, "[1,2,3] [1,2]"),
        (3, "[]"),
        (3, "1,2,3]"),
        (3, "[1,x,3]"),
        (3, "[1,,2]"),
        (3, "[1,2,]"),
        (3, "[1,2,3"),
        (3, "[1,2,3] [1,2"),
        (3, "[1,2,3] x [1,2,3]"),
        (3, "[1,[2,3]"),
    ] {
        assert!(
            matches!(Formula::parse(n, text), Err(Error::MalformedFormula(_))),
            "{} should be rejected",
            text
        );
    }
}

#[test]
fn test_literals() {
    let literal = Literal::new(3, false);
    assert_eq!(literal.to_i32(), -3);
    assert_eq!(literal.variable(), 3);
    assert!(!literal.is_positive());
    assert_eq!(literal.complement(), Literal::from_dimacs(3));
    let assignment = Assignment::new(vec![true, true, false]);
    assert!(literal.is_true_under(&assignment));
    assert!(!literal.complement().is_true_under(&assignment));
}

#[test]
fn test_assignment_json() {
    let assignment = Assignment::new(vec![true, false, true]);
    let json = serde_json::to_string(&assignment).unwrap();
    assert_eq!(json, r#"{"variables":[1,0,1]}"#);
    let parsed: Assignment = serde_json::from_str(r#"{"variables":[1,false,true]}"#).unwrap();
    assert_eq!(parsed, assignment);
    assert_eq!(assignment.flipped(2).as_slice(), &[true, true, true]);
    assert!(serde_json::from_str::<Assignment>(r#"{"variables":[2]}"#).is_err());
}

#[test]
fn test_formula_json_is_validated() {
    let formula = two_clause_formula();
    let json = serde_json::to_string(&formula).unwrap();
    assert_eq!(json, r#"{"num_variables":4,"clauses":[[1,-2,3],[-1,2,4]]}"#);
    assert_eq!(serde_json::from_str::<Formula>(&json).unwrap(), formula);
    assert!(serde_json::from_str::<Formula>(r#"{"num_variables":2,"clauses":[[1,-2,3]]}"#).is_err());
}

#[test]
fn test_variable_count_must_fit_a_literal() {
    let too_many = i32::MAX as usize + 1;
    assert!(matches!(
        Formula::new(too_many, Vec::new()),
        Err(Error::MalformedFormula(_))
    ));
    assert!(matches!(
        Formula::parse(too_many, "[1,2,3]"),
        Err(Error::MalformedFormula(_))
    ));
    assert!(Formula::new(i32::MAX as usize, vec![vec![1, -2].into()]).is_ok());
}
