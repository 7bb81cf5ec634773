use ethereum_types::U256;
use zk_tracer::exceptions::Exceptions;
use zk_tracer::replay::SnapshotFrame;
use zk_tracer::section::{SectionKind, TraceSection};
use zk_tracer::testing_utils::{
    addr, block, call_tx, contract, eoa, init_logger, step, FrameBuilder, SENDER,
};
use zk_tracer::world::{HaltReason, MemoryWorld, MessageFrameType};
use zk_tracer::{Hub, OpCode, OperationResult};

const ROOT: u64 = 0x1000;

fn world(contracts: &[u64]) -> MemoryWorld {
    contracts.iter().fold(
        MemoryWorld::default().with_account(SENDER, eoa(1_000_000_000)),
        |world, address| world.with_account(addr(*address), contract(&[0x00])),
    )
}

/// A frame at `depth` running the code of `address`.
fn at(depth: usize, address: u64) -> FrameBuilder {
    FrameBuilder::new().depth(depth).running(addr(address))
}

fn call(
    world: &MemoryWorld,
    depth: usize,
    from: u64,
    to: u64,
) -> (SnapshotFrame, SnapshotFrame) {
    let pre = at(depth, from)
        .opcode(OpCode::Call)
        .stack(&[50_000, to, 0, 0, 0, 0, 0])
        .world(world.clone())
        .build();
    let post = at(depth, from).opcode(OpCode::Call).stack(&[1]).build();
    (pre, post)
}

fn child(world: &MemoryWorld, depth: usize, address: u64) -> SnapshotFrame {
    at(depth, address)
        .frame_type(MessageFrameType::MessageCall)
        .world(world.clone())
        .build()
}

fn sections_of(sections: &[TraceSection], context_number: usize) -> Vec<&TraceSection> {
    sections
        .iter()
        .filter(|s| s.common.context_number == context_number)
        .collect()
}

#[test]
fn call_without_context_then_revert() -> anyhow::Result<()> {
    init_logger();

    let world = world(&[ROOT]);
    let tx = call_tx(addr(ROOT), 0);
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());
    hub.trace_start_tx(&world, &tx)?;

    let (pre, post) = call(&world, 0, ROOT, 0xdead);
    step(&mut hub, &pre, &post)?;

    let revert = at(0, ROOT).pc(1).opcode(OpCode::Revert).stack(&[0, 0]).build();
    step(&mut hub, &revert, &at(0, ROOT).pc(1).opcode(OpCode::Revert).build())?;
    let revert_stamp = hub.stamp();

    let root = hub.call_stack().expect("transaction in progress").top()?;
    assert_eq!(root.revert_stamp, Some(revert_stamp));
    assert!(root.self_reverts);

    hub.trace_context_exit(&at(0, ROOT).build())?;
    hub.trace_end_tx(&world, &tx, false, &[], &[], 30_000)?;

    let sections = hub.transactions()[0].sections();
    let kinds: Vec<_> = sections.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SectionKind::Initialization,
            SectionKind::Call,
            SectionKind::StackOnly,
            SectionKind::EndTransaction,
        ]
    );

    // Two stack lines, the caller's context and both accounts: no context
    // was entered.
    let call = &sections[1];
    assert_eq!(call.line_count(), 5);
    let callee = call.fragments()[4].as_account().expect("callee account");
    assert_eq!(callee.address(), addr(0xdead));
    assert!(!callee.before.exists);
    let result = call.fragments()[1].as_stack().expect("second stack line");
    assert_eq!(result.line.items[3].value, U256::one());

    assert_eq!(sections[2].common.stamp, revert_stamp);
    for section in &sections[1..3] {
        let retcon = section.retcon();
        assert!(retcon.will_revert && retcon.self_reverts && !retcon.gets_reverted);
        assert_eq!(retcon.revert_stamp, revert_stamp);
    }
    assert!(!sections[0].retcon().will_revert);

    Ok(())
}

#[test]
fn revert_reaches_the_subtree_only() -> anyhow::Result<()> {
    init_logger();

    const A: u64 = 0x2000;
    const B: u64 = 0x3000;
    const C: u64 = 0x4000;

    let world = world(&[ROOT, A, B, C]);
    let tx = call_tx(addr(ROOT), 0);
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());
    hub.trace_start_tx(&world, &tx)?;

    // ROOT calls A, which calls B, then reverts.
    let (root_call, root_call_done) = call(&world, 0, ROOT, A);
    hub.trace(&root_call)?;
    hub.trace_context_enter(&child(&world, 1, A))?;

    let (a_call, a_call_done) = call(&world, 1, A, B);
    hub.trace(&a_call)?;
    hub.trace_context_enter(&child(&world, 2, B))?;
    let stop = at(2, B).opcode(OpCode::Stop).build();
    step(&mut hub, &stop, &stop)?;
    hub.trace_context_exit(&at(2, B).build())?;
    hub.trace_post_execution(&a_call_done, Default::default())?;

    let revert = at(1, A).pc(1).opcode(OpCode::Revert).stack(&[0, 0]).build();
    step(&mut hub, &revert, &at(1, A).pc(1).opcode(OpCode::Revert).build())?;
    let revert_stamp = hub.stamp();
    hub.trace_context_exit(&at(1, A).build())?;
    hub.trace_post_execution(&root_call_done, Default::default())?;

    // ROOT then calls C, which completes.
    let (root_call, root_call_done) = call(&world, 0, ROOT, C);
    hub.trace(&root_call)?;
    hub.trace_context_enter(&child(&world, 1, C))?;
    let stop = at(1, C).opcode(OpCode::Stop).build();
    step(&mut hub, &stop, &stop)?;
    hub.trace_context_exit(&at(1, C).build())?;
    hub.trace_post_execution(&root_call_done, Default::default())?;

    let stop = at(0, ROOT).pc(2).opcode(OpCode::Stop).build();
    step(&mut hub, &stop, &stop)?;

    let context_numbers: Vec<_> = hub
        .call_stack()
        .expect("transaction in progress")
        .frames()
        .map(|frame| frame.context_number)
        .collect();
    let [root, a, b, c] = context_numbers[..] else {
        panic!("expected four frames, got {context_numbers:?}");
    };
    assert!(root < a && a < b && b < c);

    hub.trace_context_exit(&at(0, ROOT).build())?;
    hub.trace_end_tx(&world, &tx, true, &[], &[], 60_000)?;
    let sections = hub.transactions()[0].sections();

    // Each CALL section was completed exactly once.
    assert_eq!(
        sections.iter().filter(|s| s.kind == SectionKind::Call).count(),
        3
    );

    for section in sections_of(sections, a) {
        let retcon = section.retcon();
        assert!(retcon.will_revert && retcon.self_reverts);
        assert_eq!(retcon.revert_stamp, revert_stamp);
    }
    let b_sections = sections_of(sections, b);
    assert_eq!(b_sections.len(), 1);
    let retcon = b_sections[0].retcon();
    assert!(retcon.will_revert && retcon.gets_reverted && !retcon.self_reverts);
    assert_eq!(retcon.revert_stamp, revert_stamp);
    assert!(b_sections[0].common.stamp < revert_stamp);

    for context_number in [root, c] {
        for section in sections_of(sections, context_number) {
            assert!(!section.retcon().will_revert, "{:?}", section.kind);
        }
    }

    Ok(())
}

#[test]
fn entered_context_completes_the_call_section() -> anyhow::Result<()> {
    init_logger();

    const CALLEE: u64 = 0x2000;

    let world = world(&[ROOT, CALLEE]);
    let tx = call_tx(addr(ROOT), 0);
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());
    hub.trace_start_tx(&world, &tx)?;

    let (pre, post) = call(&world, 0, ROOT, CALLEE);
    hub.trace(&pre)?;
    let entered = child(&world, 1, CALLEE);
    hub.trace_context_enter(&entered)?;
    let child_context = hub
        .call_stack()
        .expect("transaction in progress")
        .top()?
        .context_number;

    let stop = at(1, CALLEE).opcode(OpCode::Stop).build();
    step(&mut hub, &stop, &stop)?;
    hub.trace_context_exit(&at(1, CALLEE).build())?;

    // The callee's last line is its STOP.
    let call_stack = hub.call_stack().expect("transaction in progress");
    let callee_frame = call_stack.by_context_number(child_context)?;
    assert_eq!(callee_frame.end_line, Some(hub.line_count() - 1));

    hub.trace_post_execution(&post, Default::default())?;
    hub.trace_context_exit(&at(0, ROOT).build())?;
    hub.trace_end_tx(&world, &tx, true, &[], &[], 30_000)?;

    let sections = hub.transactions()[0].sections();
    let call = sections
        .iter()
        .find(|s| s.kind == SectionKind::Call)
        .expect("call section");

    // The callee's context closes the section, after both accounts.
    assert_eq!(call.line_count(), 6);
    let opened = call.fragments()[5].as_context().expect("child context");
    assert_eq!(opened.context_number, child_context);
    assert_eq!(opened.account_address, addr(CALLEE));
    assert_eq!(opened.depth, 1);

    let callee = call.fragments()[4].as_account().expect("callee account");
    assert_eq!(callee.address(), addr(CALLEE));
    assert!(callee.before.exists && callee.after.warm);

    // The CALL section precedes the callee's first instruction.
    let position = |kind: SectionKind, context: usize| {
        sections
            .iter()
            .position(|s| s.kind == kind && s.common.context_number == context)
    };
    assert!(
        position(SectionKind::Call, call.common.context_number)
            < position(SectionKind::StackOnly, child_context)
    );

    Ok(())
}

#[test]
fn stop_after_a_call_returns_nothing() -> anyhow::Result<()> {
    init_logger();

    const A: u64 = 0x2000;
    const B: u64 = 0x3000;

    let world = world(&[ROOT, A, B]);
    let tx = call_tx(addr(ROOT), 0);
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());
    hub.trace_start_tx(&world, &tx)?;

    let (root_call, root_call_done) = call(&world, 0, ROOT, A);
    hub.trace(&root_call)?;
    hub.trace_context_enter(&child(&world, 1, A))?;
    let a = hub.call_stack().expect("transaction in progress").top()?.id;

    // B returns "ok" to A.
    let (a_call, a_call_done) = call(&world, 1, A, B);
    hub.trace(&a_call)?;
    hub.trace_context_enter(&child(&world, 2, B))?;
    let ret = at(2, B).opcode(OpCode::Return).stack(&[0, 2]).build();
    step(&mut hub, &ret, &at(2, B).opcode(OpCode::Return).build())?;
    hub.trace_context_exit(&at(2, B).output(b"ok".to_vec()).build())?;
    hub.trace_post_execution(&a_call_done, Default::default())?;

    // A stops, its return data still holding what B returned.
    let stop = at(1, A).pc(1).opcode(OpCode::Stop).build();
    step(&mut hub, &stop, &stop)?;
    hub.trace_context_exit(&at(1, A).return_data(b"ok".to_vec()).build())?;
    hub.trace_post_execution(&root_call_done, Default::default())?;

    let call_stack = hub.call_stack().expect("transaction in progress");
    let a = call_stack.by_id(a)?;
    assert!(a.output_data.is_empty());
    assert_eq!(&a.return_data[..], b"ok");
    assert!(call_stack.top()?.return_data.is_empty());

    Ok(())
}

#[test]
fn interpreter_halt_zeroes_the_result_and_reverts() -> anyhow::Result<()> {
    init_logger();

    let world = world(&[ROOT]);
    let tx = call_tx(addr(ROOT), 0);
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());
    hub.trace_start_tx(&world, &tx)?;

    let add = at(0, ROOT).opcode(OpCode::Add).stack(&[1, 2]).build();
    hub.trace(&add)?;
    let add_stamp = hub.stamp();
    let added = at(0, ROOT).pc(1).opcode(OpCode::Add).stack(&[3]).build();
    hub.trace_post_execution(&added, OperationResult::halted(3, HaltReason::OutOfGas))?;

    let root = hub.call_stack().expect("transaction in progress").top()?;
    assert_eq!(root.revert_stamp, Some(add_stamp));
    assert!(root.self_reverts);

    hub.trace_context_exit(&at(0, ROOT).build())?;
    hub.trace_end_tx(&world, &tx, false, &[], &[], 1_000_000)?;

    let sections = hub.transactions()[0].sections();
    let add = &sections[1];
    assert_eq!(add.kind, SectionKind::StackOnly);
    assert_eq!(add.common.exceptions, Exceptions::OUT_OF_GAS);
    let line = add.fragments()[0].as_stack().expect("stack line");
    assert_eq!(line.line.items[3].value, U256::zero());
    assert!(add.retcon().will_revert && add.retcon().self_reverts);
    assert_eq!(add.retcon().revert_stamp, add_stamp);

    Ok(())
}

#[test]
fn halted_call_without_context_is_completed_after_execution() -> anyhow::Result<()> {
    init_logger();

    const CALLEE: u64 = 0x2000;

    let world = world(&[ROOT, CALLEE]);
    let tx = call_tx(addr(ROOT), 0);
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());
    hub.trace_start_tx(&world, &tx)?;

    let (pre, post) = call(&world, 0, ROOT, CALLEE);
    hub.trace(&pre)?;
    let call_stamp = hub.stamp();
    hub.trace_post_execution(&post, OperationResult::halted(700, HaltReason::OutOfGas))?;

    let root = hub.call_stack().expect("transaction in progress").top()?;
    assert_eq!(root.revert_stamp, Some(call_stamp));

    hub.trace_context_exit(&at(0, ROOT).build())?;
    hub.trace_end_tx(&world, &tx, false, &[], &[], 1_000_000)?;

    let sections = hub.transactions()[0].sections();
    let call = sections
        .iter()
        .find(|s| s.kind == SectionKind::Call)
        .expect("call section");
    assert_eq!(call.common.stamp, call_stamp);
    assert_eq!(call.line_count(), 5);
    assert!(call.common.exceptions.contains(Exceptions::OUT_OF_GAS));

    // The success flag pushed by the interpreter is not trusted.
    let result = call.fragments()[1].as_stack().expect("second stack line");
    assert_eq!(result.line.items[3].value, U256::zero());
    let retcon = call.retcon();
    assert!(retcon.will_revert && retcon.self_reverts);
    assert_eq!(retcon.revert_stamp, call_stamp);

    Ok(())
}
