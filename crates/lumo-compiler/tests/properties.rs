//! Property tests over randomly generated programs

use lumo_bytecode::{Constant, Program, Register};
use lumo_compiler::ast::{BinaryOperator, Chunk, Clause, Expression, Statement, TableField};
use lumo_compiler::codegen::CodeGen;
use lumo_compiler::compile;
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "print"]).prop_map(String::from)
}

fn expression() -> impl Strategy<Value = Expression> {
    let leaf = prop_oneof![
        (0u8..5).prop_map(|n| Expression::number(f64::from(n))),
        prop::sample::select(vec!["s", "t"]).prop_map(Expression::string),
        any::<bool>().prop_map(Expression::boolean),
        Just(Expression::nil()),
        name().prop_map(Expression::ident),
    ];

    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            (
                prop::sample::select(vec![
                    BinaryOperator::Add,
                    BinaryOperator::Sub,
                    BinaryOperator::Mul,
                    BinaryOperator::Eq,
                ]),
                inner.clone(),
                inner.clone(),
            )
                .prop_map(|(op, left, right)| Expression::binary(op, left, right)),
            (name(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(callee, args)| Expression::call(Expression::ident(callee), args)),
            (inner.clone(), name()).prop_map(|(base, field)| Expression::member(base, field)),
            prop::collection::vec(inner.prop_map(TableField::positional), 0..3)
                .prop_map(Expression::table),
        ]
    })
}

fn statement() -> impl Strategy<Value = Statement> {
    let simple = prop_oneof![
        (name(), expression()).prop_map(|(n, e)| Statement::local(&[n.as_str()], vec![e])),
        (name(), expression())
            .prop_map(|(n, e)| Statement::assign(vec![Expression::ident(n)], vec![e])),
        (name(), name(), expression()).prop_map(|(table, field, e)| {
            Statement::assign(vec![Expression::member(Expression::ident(table), field)], vec![e])
        }),
        (name(), prop::collection::vec(expression(), 0..3)).prop_map(|(callee, args)| {
            Statement::call(Expression::call(Expression::ident(callee), args))
        }),
    ];

    simple.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            (
                expression(),
                prop::collection::vec(
                    prop_oneof![3 => inner.clone(), 1 => Just(Statement::break_loop())],
                    0..4
                ),
            )
                .prop_map(|(condition, body)| Statement::while_loop(condition, body)),
            (
                prop::collection::vec((expression(), prop::collection::vec(inner.clone(), 0..3)), 1..4),
                prop::option::of(prop::collection::vec(inner, 0..3)),
            )
                .prop_map(|(tests, otherwise)| {
                    let mut clauses: Vec<Clause> = tests
                        .into_iter()
                        .enumerate()
                        .map(|(i, (condition, body))| {
                            if i == 0 {
                                Clause::when(condition, body)
                            } else {
                                Clause::or_when(condition, body)
                            }
                        })
                        .collect();
                    if let Some(body) = otherwise {
                        clauses.push(Clause::otherwise(body));
                    }
                    Statement::if_chain(clauses)
                }),
        ]
    })
}

fn chunk() -> impl Strategy<Value = Chunk> {
    prop::collection::vec(statement(), 0..6).prop_map(Chunk::new)
}

fn constant() -> impl Strategy<Value = Constant> {
    prop_oneof![
        (0u8..4).prop_map(|n| Constant::number(f64::from(n))),
        prop::sample::select(vec!["x", "y", "1"]).prop_map(Constant::string),
        any::<bool>().prop_map(Constant::boolean),
    ]
}

proptest! {
    #[test]
    fn prop_registers_allocated_in_order(chunk in chunk()) {
        let program = compile(&chunk).unwrap();

        // Every register is written exactly once, in allocation order
        let written: Vec<Register> = program.instructions.iter().filter_map(|i| i.dst()).collect();
        let expected: Vec<Register> = (1..=written.len() as u32).map(Register).collect();
        prop_assert_eq!(written, expected);
    }

    #[test]
    fn prop_constant_pool_has_no_duplicates(chunk in chunk()) {
        let program = compile(&chunk).unwrap();
        let constants: Vec<&Constant> = program.constants.iter().collect();

        for (i, a) in constants.iter().enumerate() {
            for b in &constants[i + 1..] {
                prop_assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn prop_every_jump_target_resolved(chunk in chunk()) {
        let program = compile(&chunk).unwrap();
        let len = program.len() as u32;

        for instruction in &program.instructions {
            if let Some(target) = instruction.target() {
                prop_assert!(target.pc() <= len);
            }
        }
        prop_assert!(program.validate().is_ok());

        let decoded = Program::from_json(&program.to_json().unwrap()).unwrap();
        prop_assert_eq!(decoded, program);
    }

    #[test]
    fn prop_compilation_is_deterministic(chunk in chunk()) {
        prop_assert_eq!(compile(&chunk).unwrap(), compile(&chunk).unwrap());
    }

    #[test]
    fn prop_interning_dedups_in_first_occurrence_order(values in prop::collection::vec(constant(), 0..20)) {
        let mut codegen = CodeGen::new();
        let mut seen: Vec<Constant> = Vec::new();

        for value in values {
            let index = codegen.add_constant(value.clone()).unwrap();

            match seen.iter().position(|c| *c == value) {
                Some(pos) => prop_assert_eq!(index.0 as usize, pos),
                None => {
                    prop_assert_eq!(index.0 as usize, seen.len());
                    seen.push(value);
                }
            }
        }

        prop_assert_eq!(codegen.constants.len(), seen.len());
    }
}
