use ethereum_types::{Address, H256, U256};
use zk_tracer::callstack::CallFrameType;
use zk_tracer::section::SectionKind;
use zk_tracer::state::SealedTxTrace;
use zk_tracer::testing_utils::{
    addr, block, call_tx, contract, deployment_tx, eoa, init_logger, step, word, FrameBuilder,
    SENDER,
};
use zk_tracer::trace::Column;
use zk_tracer::world::{MemoryWorld, MessageFrameType};
use zk_tracer::{Hub, OpCode};
use zk_tracer_common::create2_address;

const FACTORY: u64 = 0x5000;
const SALT: u64 = 7;

/// PUSH1 1, PUSH1 0, SSTORE, PUSH1 2, PUSH1 0, RETURN
const INIT_CODE: [u8; 10] = [0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x02, 0x60, 0x00, 0xf3];

fn world() -> MemoryWorld {
    MemoryWorld::default()
        .with_account(SENDER, eoa(1_000_000_000))
        .with_account(addr(FACTORY), contract(&[0xf5]))
}

fn create2_target() -> Address {
    create2_address(addr(FACTORY), H256::from_low_u64_be(SALT), &INIT_CODE)
}

/// Runs a transaction in which the factory deploys [`INIT_CODE`] with
/// `CREATE2`, the initialization code returning `deployed`.
fn run_factory(
    hub: &mut Hub,
    world: &MemoryWorld,
    nonce: u64,
    deployed: &[u8],
) -> anyhow::Result<()> {
    let target = create2_target();
    let tx = call_tx(addr(FACTORY), nonce);
    hub.trace_start_tx(world, &tx)?;

    let factory = || FrameBuilder::new().running(addr(FACTORY));
    let create = factory()
        .opcode(OpCode::Create2)
        .stack(&[0, 0, INIT_CODE.len() as u64, SALT])
        .memory(&INIT_CODE)
        .world(world.clone())
        .build();
    hub.trace(&create)?;

    let init = || {
        FrameBuilder::new()
            .depth(1)
            .running(target)
            .frame_type(MessageFrameType::ContractCreation)
    };
    hub.trace_context_enter(&init().code(&INIT_CODE).world(world.clone()).build())?;
    assert!(hub.deployments().is_deploying(target));

    let store = init().pc(4).opcode(OpCode::Sstore).stack(&[0, 1]).build();
    step(hub, &store, &init().pc(5).opcode(OpCode::Sstore).build())?;
    let ret = init().pc(9).opcode(OpCode::Return).stack(&[0, 2]).build();
    step(hub, &ret, &init().pc(9).opcode(OpCode::Return).build())?;
    hub.trace_context_exit(&init().output(deployed.to_vec()).build())?;

    let rejected = hub
        .call_stack()
        .and_then(|stack| stack.frames().last())
        .is_some_and(|frame| frame.will_revert());
    let created = if rejected {
        U256::zero()
    } else {
        word(target)
    };
    let done = factory().opcode(OpCode::Create2).stack_words(&[created]).build();
    hub.trace_post_execution(&done, Default::default())?;

    hub.trace_context_exit(&factory().build())?;
    hub.trace_end_tx(world, &tx, true, &[], &[], 60_000)?;
    Ok(())
}

/// Deployment numbers of the storage rows of `address` in `tx`.
fn storage_epochs(tx: &SealedTxTrace, address: Address) -> Vec<usize> {
    tx.sections()
        .iter()
        .flat_map(|s| s.fragments())
        .filter_map(|f| f.as_storage())
        .filter(|storage| storage.address == address)
        .map(|storage| storage.deployment_number)
        .collect()
}

#[test]
fn redeployment_bumps_the_deployment_number() -> anyhow::Result<()> {
    init_logger();

    let target = create2_target();
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());

    run_factory(&mut hub, &world(), 0, &[0x60, 0x00])?;
    assert_eq!(hub.deployments().number(target), 1);
    assert!(!hub.deployments().is_deploying(target));

    // The deployed contract stores a slot, then destroys itself.
    let deployed = world().with_account(target, contract(&[0x55, 0xff]));
    let tx = call_tx(target, 1);
    hub.trace_start_tx(&deployed, &tx)?;
    let runtime = || FrameBuilder::new().running(target);
    let store = runtime().opcode(OpCode::Sstore).stack(&[0, 3]).build();
    step(&mut hub, &store, &runtime().pc(1).opcode(OpCode::Sstore).build())?;
    let destroy = runtime()
        .pc(1)
        .opcode(OpCode::Selfdestruct)
        .stack(&[0x5e])
        .build();
    step(&mut hub, &destroy, &destroy)?;
    hub.trace_context_exit(&FrameBuilder::new().running(target).build())?;
    hub.trace_end_tx(&world(), &tx, true, &[], &[], 30_000)?;
    assert_eq!(hub.deployments().number(target), 1);

    run_factory(&mut hub, &world(), 2, &[0x60, 0x00])?;
    assert_eq!(hub.deployments().number(target), 2);

    let transactions = hub.transactions();
    let created = |tx: usize| {
        let section = transactions[tx]
            .sections()
            .iter()
            .find(|s| s.kind == SectionKind::Create)
            .expect("create section");
        *section.fragments()[4].as_account().expect("created account")
    };
    let first = created(0);
    assert_eq!(first.address(), target);
    assert_eq!(
        (first.before.deployment_number, first.after.deployment_number),
        (0, 1)
    );
    assert!(!first.before.deployment_status && first.after.deployment_status);

    let second = created(2);
    assert_eq!(
        (second.before.deployment_number, second.after.deployment_number),
        (1, 2)
    );

    // Constructor rows belong to the incarnation being deployed, runtime
    // rows to the one that was deployed.
    assert_eq!(storage_epochs(&transactions[0], target), vec![1]);
    assert_eq!(storage_epochs(&transactions[1], target), vec![1]);
    assert_eq!(storage_epochs(&transactions[2], target), vec![2]);
    let constructor = transactions[2]
        .sections()
        .iter()
        .find(|s| s.kind == SectionKind::Storage)
        .expect("constructor store");
    assert_eq!(constructor.common.code_address, target);
    assert_eq!(constructor.common.code_deployment_number, 2);
    assert!(constructor.common.code_deployment_status);

    let destroyed = transactions[1].sections()[0].fragments()[2]
        .as_account()
        .expect("recipient account");
    assert_eq!(destroyed.address(), target);
    assert_eq!(destroyed.before.deployment_number, 1);

    hub.trace_end_conflation()?;
    let columns = hub.commit()?;

    // Every row of the address carries the epoch of the end of the
    // conflation.
    let rows: Vec<_> = (0..columns.rows())
        .filter(|row| {
            columns.get(Column::PeekAtAccount, *row) == Some(U256::one())
                && columns.get(Column::AccountAddress, *row) == Some(word(target))
        })
        .collect();
    assert!(rows.len() >= 3);
    for row in rows {
        assert_eq!(
            columns.get(Column::AccountDeploymentNumberInfty, row),
            Some(U256::from(2))
        );
        assert_eq!(
            columns.get(Column::AccountDeploymentStatusInfty, row),
            Some(U256::zero())
        );
    }

    Ok(())
}

#[test]
fn rejected_code_is_not_deployed() -> anyhow::Result<()> {
    init_logger();

    let target = create2_target();
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());

    // Code starting with 0xef cannot be deployed.
    run_factory(&mut hub, &world(), 0, &[0xef, 0x00])?;
    assert_eq!(hub.deployments().number(target), 0);
    assert!(!hub.deployments().is_deploying(target));

    // The failed attempt's constructor still ran under the epoch it opened.
    assert_eq!(storage_epochs(&hub.transactions()[0], target), vec![1]);

    // The next attempt opens the same epoch again.
    run_factory(&mut hub, &world(), 1, &[0x60, 0x00])?;
    assert_eq!(hub.deployments().number(target), 1);
    assert_eq!(storage_epochs(&hub.transactions()[1], target), vec![1]);

    let sections = hub.transactions()[0].sections();
    let create = sections
        .iter()
        .find(|s| s.kind == SectionKind::Create)
        .expect("create section");
    let init = sections
        .iter()
        .find(|s| s.kind == SectionKind::StackOnly)
        .expect("initialization code section");
    assert!(init.common.context_number > create.common.context_number);
    assert!(init.retcon().will_revert && init.retcon().self_reverts);
    assert!(!create.retcon().will_revert);

    Ok(())
}

#[test]
fn deployment_transaction_deploys_once() -> anyhow::Result<()> {
    init_logger();

    for success in [true, false] {
        let tx = deployment_tx(&INIT_CODE, 0);
        let target = tx.effective_to();
        let world = MemoryWorld::default().with_account(SENDER, eoa(1_000_000_000));

        let mut hub = Hub::default();
        hub.trace_start_conflation();
        hub.trace_start_block(&block());
        hub.trace_start_tx(&world, &tx)?;

        let root = hub.call_stack().expect("transaction in progress").top()?;
        assert_eq!(root.frame_type, CallFrameType::InitCode);
        assert_eq!(root.address, target);
        assert!(hub.deployments().is_deploying(target));
        assert_eq!(root.code_deployment_number, 1);

        let init = || {
            FrameBuilder::new()
                .running(target)
                .frame_type(MessageFrameType::ContractCreation)
        };
        hub.trace_context_enter(&init().code(&INIT_CODE).build())?;
        let ret = init().pc(9).opcode(OpCode::Return).stack(&[0, 2]).build();
        step(&mut hub, &ret, &init().pc(9).opcode(OpCode::Return).build())?;
        hub.trace_context_exit(&init().output(vec![0x60, 0x00]).build())?;
        hub.trace_end_tx(&world, &tx, success, &[], &[], 60_000)?;

        let expected = usize::from(success);
        assert_eq!(hub.deployments().number(target), expected);
        assert!(!hub.deployments().is_deploying(target));

        let init_section = &hub.transactions()[0].sections()[0];
        assert_eq!(init_section.kind, SectionKind::Initialization);
        let recipient = init_section.fragments()[2]
            .as_account()
            .expect("recipient account");
        assert_eq!(recipient.address(), target);
        assert_eq!(recipient.after.nonce, 1);
        assert!(recipient.after.exists && recipient.after.deployment_status);
        assert_eq!(
            (recipient.before.deployment_number, recipient.after.deployment_number),
            (0, 1)
        );

        hub.trace_end_conflation()?;
        assert!(hub.commit()?.rows() > 0);
    }

    Ok(())
}

#[test]
fn skipped_deployment_counts() -> anyhow::Result<()> {
    init_logger();

    let tx = deployment_tx(&[], 0);
    let target = tx.effective_to();
    let world = MemoryWorld::default().with_account(SENDER, eoa(1_000_000_000));
    let mut hub = Hub::default();
    hub.trace_start_conflation();
    hub.trace_start_block(&block());
    hub.trace_start_tx(&world, &tx)?;
    assert!(hub.call_stack().is_some_and(|stack| stack.is_empty()));

    let settled = world.clone().with_account(target, eoa(0));
    hub.trace_end_tx(&settled, &tx, true, &[], &[], 53_000)?;
    assert_eq!(hub.deployments().number(target), 1);

    let sections = hub.transactions()[0].sections();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].kind, SectionKind::Skip);
    let recipient = sections[0].fragments()[1].as_account().expect("recipient");
    assert!(!recipient.before.exists);
    assert!(recipient.after.exists);
    assert_eq!(recipient.after.deployment_number, 1);

    Ok(())
}
