//! Visibility of nodes and sub-queries across sessions and with clauses.

use proxyql::{Arg, ErrorKind, QueryError};

use super::fixtures::factory;

#[test]
fn test_sibling_subquery_node_rejected() {
    let query = factory().select();
    query.from("Person").unwrap();

    let first = query.subquery().unwrap();
    let first_person = first.from("Person").unwrap();
    let second = query.subquery().unwrap();
    second.from("Person").unwrap();

    let err = second
        .where_(first_person.get_i64("getAge").unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);
    assert_eq!(
        err,
        QueryError::OutOfScope {
            path: "Person.age".to_string()
        }
    );

    let err = query
        .select(first_person.get_str("getName").unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);
}

#[test]
fn test_ancestor_node_accepted_in_nested_subquery() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    let outer = query.subquery().unwrap();
    outer.from("Relation").unwrap();
    let inner = outer.subquery().unwrap();
    let other = inner.from("Person").unwrap();

    inner
        .where_(other.get_i64("getAge").unwrap())
        .unwrap()
        .gt(person.get_i64("getAge").unwrap())
        .unwrap();
    outer.exists(&inner).unwrap();
    query.exists(&outer).unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "from Person person_0 where exists (select relation_1 from Relation relation_1 \
         where exists (select person_2 from Person person_2 where person_2.age > person_0.age))"
    );
}

#[test]
fn test_nested_subquery_not_usable_at_root() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let outer = query.subquery().unwrap();
    outer.from("Person").unwrap();
    let inner = outer.subquery().unwrap();
    inner.from("Person").unwrap();

    let err = query
        .where_(person.get_i64("getId").unwrap())
        .unwrap()
        .in_subquery(&inner)
        .unwrap_err();
    assert_eq!(err, QueryError::SubqueryOutOfScope);
    assert!(query.exists(&query).is_err());
}

#[test]
fn test_with_clause_rejects_later_join() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = query.left_join(person.navigate("getSpouse").unwrap()).unwrap();
    let child = query
        .inner_join(person.get_collection("getChildren").unwrap())
        .unwrap();

    let err = query
        .with(&spouse, child.get_str("getName").unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);
    assert!(matches!(err, QueryError::ForwardJoinReference { .. }));

    query
        .with(&child, spouse.get_str("getName").unwrap())
        .unwrap()
        .eq(child.get_str("getName").unwrap())
        .unwrap();
    assert_eq!(
        query.build().unwrap().text,
        "from Person person_0 left join person_0.spouse person_1 \
         inner join person_0.children person_2 with person_1.name = person_2.name"
    );
}

#[test]
fn test_case_conditions_are_scope_checked() {
    let query = factory().select();
    query.from("Person").unwrap();
    let sub = query.subquery().unwrap();
    let other = sub.from("Person").unwrap();

    let condition = sub
        .condition(other.get_i64("getAge").unwrap())
        .unwrap()
        .lt(18)
        .unwrap();
    let case = sub.case_when(&condition, "minor").unwrap().end().unwrap();

    let err = query.select(case).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);
}

#[test]
fn test_foreign_queries_rejected() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let foreign = factory().select();
    let foreign_person = foreign.from("Person").unwrap();
    let foreign_join = foreign
        .left_join(foreign_person.navigate("getSpouse").unwrap())
        .unwrap();
    let foreign_sub = foreign.subquery().unwrap();

    assert_eq!(
        query.with(&foreign_join, 1).unwrap_err(),
        QueryError::ForeignQuery
    );
    assert_eq!(
        query
            .where_(person.get_i64("getId").unwrap())
            .unwrap()
            .in_subquery(&foreign_sub)
            .unwrap_err(),
        QueryError::ForeignQuery
    );
}

#[test]
fn test_subquery_cannot_be_built_alone() {
    let query = factory().select();
    query.from("Person").unwrap();
    let sub = query.subquery().unwrap();
    sub.from("Person").unwrap();
    assert_eq!(sub.build().unwrap_err(), QueryError::SubqueryBuild);
}

#[test]
fn test_with_clause_accepts_root_property_navigated_after_join() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = query.left_join(person.navigate("getSpouse").unwrap()).unwrap();

    query
        .with(&spouse, spouse.get_str("getName").unwrap())
        .unwrap()
        .eq(person.get_str("getName").unwrap())
        .unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "from Person person_0 left join person_0.spouse person_1 \
         with person_1.name = person_0.name"
    );
}

#[test]
fn test_foreign_handles_rejected_by_every_builder() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = person.navigate("getSpouse").unwrap();
    let sub = query.subquery().unwrap();
    sub.from("Person").unwrap();
    let lowered = query.lower(person.get_str("getName").unwrap()).unwrap();

    let other = factory().select();
    let other_person = other.from("Person").unwrap();
    other_person.navigate("getSpouse").unwrap();

    assert_eq!(other.where_(&spouse).unwrap_err(), QueryError::ForeignQuery);
    assert_eq!(other.value(&spouse).unwrap_err(), QueryError::ForeignQuery);
    assert_eq!(other.select(&person).unwrap_err(), QueryError::ForeignQuery);
    assert_eq!(other.select(lowered).unwrap_err(), QueryError::ForeignQuery);
    assert_eq!(other.where_(&sub).unwrap_err(), QueryError::ForeignQuery);
    assert_eq!(
        other
            .concat(vec![Arg::from("x"), Arg::from(&person)])
            .unwrap_err(),
        QueryError::ForeignQuery
    );
    assert_eq!(
        other
            .where_(other_person.get_i64("getId").unwrap())
            .unwrap()
            .in_list(vec![Arg::from(1), Arg::from(&spouse)])
            .unwrap_err(),
        QueryError::ForeignQuery
    );
    assert_eq!(
        other.inner_join(&spouse).unwrap_err(),
        QueryError::ForeignQuery
    );

    assert_eq!(other.build().unwrap().text, "from Person person_0");
}

#[test]
fn test_rejected_call_leaves_no_join() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let first = query.subquery().unwrap();
    let sibling = first.from("Person").unwrap();
    let second = query.subquery().unwrap();
    second.from("Person").unwrap();
    let spouse = person.navigate("getSpouse").unwrap();

    let err = second
        .concat(vec![
            Arg::from(spouse.get_str("getName").unwrap()),
            Arg::from(&sibling),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);

    let err = query
        .where_(spouse.get_i64("getAge").unwrap())
        .unwrap()
        .eq(&sibling)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);

    assert_eq!(query.build().unwrap().text, "from Person person_0");
}
