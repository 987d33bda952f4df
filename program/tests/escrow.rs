use assert_matches::assert_matches;
use borsh::BorshDeserialize;
use ledger::{
    allocation_cost, find_derived_address, Address, Keypair, Ledger, TransactionError,
    TRANSACTION_FEE,
};
use num_traits::FromPrimitive;
use program::{Error, Escrow, RECORD_SEED, VAULT_SEED};

const SOL: u64 = 1_000_000_000;
const FEE_TOLERANCE: u64 = 10_000;

fn setup() -> Ledger {
    let mut ledger = Ledger::new();
    program::register(&mut ledger);
    ledger
}

fn funded(ledger: &mut Ledger, amount: u64) -> Keypair {
    let keypair = Keypair::generate();
    ledger.airdrop(&keypair.address(), amount);
    keypair
}

fn escrow_addresses(maker: &Address) -> (Address, Address) {
    let (record, _) = find_derived_address(RECORD_SEED, maker, &program::id());
    let (vault, _) = find_derived_address(VAULT_SEED, &record, &program::id());
    (record, vault)
}

fn program_error(error: TransactionError) -> Option<Error> {
    match error {
        TransactionError::Custom(code) => Error::from_u32(code),
        _ => None,
    }
}

fn open(ledger: &mut Ledger, maker: &Keypair, taker: &Address, amount: u64) {
    let mut transaction = program::make(&maker.address(), taker, amount);
    transaction.sign(maker);
    ledger.execute(&transaction).unwrap();
}

#[test]
fn make_opens_escrow_with_given_amount_and_taker() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = Keypair::generate().address();
    let (record_address, vault_address) = escrow_addresses(&maker.address());
    let maker_before = ledger.balance(&maker.address());

    open(&mut ledger, &maker, &taker, SOL);

    let record_account = ledger.account(&record_address).unwrap();
    assert_eq!(record_account.owner, program::id());
    let record = Escrow::try_from_slice(&record_account.data).unwrap();
    assert_eq!(record.maker, maker.address());
    assert_eq!(record.taker, taker);
    assert_eq!(record.amount, SOL);

    assert_eq!(ledger.balance(&vault_address), SOL);

    let maker_after = ledger.balance(&maker.address());
    assert!(maker_before - maker_after >= SOL);
    assert_eq!(
        maker_before - maker_after,
        SOL + allocation_cost(Escrow::LEN) + TRANSACTION_FEE
    );
}

#[test]
fn make_rejects_zero_amount() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = Keypair::generate().address();
    let (record_address, vault_address) = escrow_addresses(&maker.address());

    let mut transaction = program::make(&maker.address(), &taker, 0);
    transaction.sign(&maker);
    let err = ledger.execute(&transaction).unwrap_err();

    assert_eq!(program_error(err), Some(Error::InvalidAmount));
    assert!(ledger.account(&record_address).is_none());
    assert!(ledger.account(&vault_address).is_none());
}

#[test]
fn make_rejects_second_open_for_same_maker() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = Keypair::generate().address();
    let (record_address, _) = escrow_addresses(&maker.address());
    open(&mut ledger, &maker, &taker, SOL);
    let original = Escrow::try_from_slice(&ledger.account(&record_address).unwrap().data).unwrap();

    let mut transaction = program::make(&maker.address(), &taker, 2 * SOL);
    transaction.sign(&maker);
    let err = ledger.execute(&transaction).unwrap_err();

    assert_eq!(program_error(err), Some(Error::AlreadyOpen));
    let untouched = Escrow::try_from_slice(&ledger.account(&record_address).unwrap().data).unwrap();
    assert_eq!(untouched, original);
}

#[test]
fn make_rejects_underfunded_maker() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 100_000);
    let taker = Keypair::generate().address();
    let (record_address, _) = escrow_addresses(&maker.address());

    let mut transaction = program::make(&maker.address(), &taker, SOL);
    transaction.sign(&maker);
    let err = ledger.execute(&transaction).unwrap_err();

    assert_matches!(err, TransactionError::InsufficientFunds);
    assert!(ledger.account(&record_address).is_none());
}

#[test]
fn make_requires_maker_signature() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = Keypair::generate().address();

    let transaction = program::make(&maker.address(), &taker, SOL);
    let err = ledger.execute(&transaction).unwrap_err();
    assert_matches!(err, TransactionError::MissingRequiredSignature);
}

#[test]
fn take_pays_the_taker_and_closes_the_escrow() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = funded(&mut ledger, 2 * SOL);
    let (record_address, vault_address) = escrow_addresses(&maker.address());
    open(&mut ledger, &maker, &taker.address(), SOL);

    let taker_before = ledger.balance(&taker.address());
    let vault_before = ledger.balance(&vault_address);
    assert_eq!(vault_before, SOL);

    let mut transaction = program::take(&taker.address(), &maker.address());
    transaction.sign(&taker);
    ledger.execute(&transaction).unwrap();

    assert_eq!(ledger.balance(&vault_address), 0);
    assert!(ledger.account(&vault_address).is_none());
    assert!(ledger.account(&record_address).is_none());
    let taker_after = ledger.balance(&taker.address());
    assert!(taker_after >= taker_before + vault_before - FEE_TOLERANCE);
}

#[test]
fn take_rejects_any_signer_but_the_taker() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = Keypair::generate().address();
    let intruder = funded(&mut ledger, SOL);
    let (record_address, vault_address) = escrow_addresses(&maker.address());
    open(&mut ledger, &maker, &taker, SOL);
    let record_before =
        Escrow::try_from_slice(&ledger.account(&record_address).unwrap().data).unwrap();

    let mut transaction = program::take(&intruder.address(), &maker.address());
    transaction.sign(&intruder);
    let err = ledger.execute(&transaction).unwrap_err();

    assert_eq!(program_error(err), Some(Error::Unauthorized));
    assert_eq!(ledger.balance(&vault_address), SOL);
    let record_after =
        Escrow::try_from_slice(&ledger.account(&record_address).unwrap().data).unwrap();
    assert_eq!(record_after, record_before);
    // Only the fee was lost on the failed attempt.
    assert_eq!(ledger.balance(&intruder.address()), SOL - TRANSACTION_FEE);
}

#[test]
fn take_is_terminal() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = funded(&mut ledger, 2 * SOL);
    open(&mut ledger, &maker, &taker.address(), SOL);

    let mut transaction = program::take(&taker.address(), &maker.address());
    transaction.sign(&taker);
    ledger.execute(&transaction).unwrap();

    let mut again = program::take(&taker.address(), &maker.address());
    again.sign(&taker);
    let err = ledger.execute(&again).unwrap_err();
    assert_eq!(program_error(err), Some(Error::NotOpen));

    let mut refund = program::refund(&maker.address());
    refund.sign(&maker);
    let err = ledger.execute(&refund).unwrap_err();
    assert_eq!(program_error(err), Some(Error::NotOpen));
}

#[test]
fn refund_pays_the_maker_and_closes_the_escrow() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 2 * SOL);
    let taker = Keypair::generate().address();
    let amount = 500_000_000;
    let (record_address, vault_address) = escrow_addresses(&maker.address());
    open(&mut ledger, &maker, &taker, amount);

    let maker_before = ledger.balance(&maker.address());
    let vault_before = ledger.balance(&vault_address);
    assert_eq!(vault_before, amount);

    let mut transaction = program::refund(&maker.address());
    transaction.sign(&maker);
    ledger.execute(&transaction).unwrap();

    assert_eq!(ledger.balance(&vault_address), 0);
    assert!(ledger.account(&record_address).is_none());
    let maker_after = ledger.balance(&maker.address());
    assert!(maker_after >= maker_before + vault_before - FEE_TOLERANCE);
}

#[test]
fn refund_rejects_any_signer_but_the_maker() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = funded(&mut ledger, 2 * SOL);
    let (_, vault_address) = escrow_addresses(&maker.address());
    open(&mut ledger, &maker, &taker.address(), SOL);

    // The taker tries to trigger the maker's exit path.
    let mut transaction = program::refund(&maker.address());
    transaction.sign(&taker);
    let err = ledger.execute(&transaction).unwrap_err();

    assert_matches!(err, TransactionError::MissingRequiredSignature);
    assert_eq!(ledger.balance(&vault_address), SOL);

    // Signing as oneself against someone else's escrow is unauthorized too.
    let intruder = funded(&mut ledger, SOL);
    let (record, _) = find_derived_address(RECORD_SEED, &maker.address(), &program::id());
    let (vault, _) = find_derived_address(VAULT_SEED, &record, &program::id());
    let mut forged = ledger::Transaction::new(
        program::id(),
        &program::Instruction::Refund,
        vec![
            ledger::AccountMeta::new(intruder.address(), true),
            ledger::AccountMeta::new(vault, false),
            ledger::AccountMeta::new(record, false),
            ledger::AccountMeta::new_readonly(ledger::SYSTEM_ID, false),
        ],
    );
    forged.sign(&intruder);
    let err = ledger.execute(&forged).unwrap_err();
    assert_eq!(program_error(err), Some(Error::Unauthorized));
    assert_eq!(ledger.balance(&vault_address), SOL);
}

#[test]
fn refund_is_terminal() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 2 * SOL);
    let taker = funded(&mut ledger, SOL);
    open(&mut ledger, &maker, &taker.address(), 500_000_000);

    let mut transaction = program::refund(&maker.address());
    transaction.sign(&maker);
    ledger.execute(&transaction).unwrap();

    let mut again = program::refund(&maker.address());
    again.sign(&maker);
    let err = ledger.execute(&again).unwrap_err();
    assert_eq!(program_error(err), Some(Error::NotOpen));

    let mut take = program::take(&taker.address(), &maker.address());
    take.sign(&taker);
    let err = ledger.execute(&take).unwrap_err();
    assert_eq!(program_error(err), Some(Error::NotOpen));
}

#[test]
fn closed_escrow_address_is_free_for_a_new_cycle() {
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = Keypair::generate().address();
    let (record_address, vault_address) = escrow_addresses(&maker.address());

    open(&mut ledger, &maker, &taker, SOL);
    let mut refund = program::refund(&maker.address());
    refund.sign(&maker);
    ledger.execute(&refund).unwrap();

    // Same maker, same derived addresses, fresh escrow.
    open(&mut ledger, &maker, &taker, 3 * SOL);
    let record = Escrow::try_from_slice(&ledger.account(&record_address).unwrap().data).unwrap();
    assert_eq!(record.amount, 3 * SOL);
    assert_eq!(ledger.balance(&vault_address), 3 * SOL);
}

#[test]
fn full_trade_scenario() {
    // Maker deposits 1_000_000_000; taker collects it.
    let mut ledger = setup();
    let maker = funded(&mut ledger, 10 * SOL);
    let taker = funded(&mut ledger, 2 * SOL);
    let (_, vault_address) = escrow_addresses(&maker.address());
    let maker_start = ledger.balance(&maker.address());
    let taker_start = ledger.balance(&taker.address());

    open(&mut ledger, &maker, &taker.address(), 1_000_000_000);
    assert_eq!(ledger.balance(&vault_address), 1_000_000_000);
    assert!(maker_start - ledger.balance(&maker.address()) >= 1_000_000_000);

    let mut take = program::take(&taker.address(), &maker.address());
    take.sign(&taker);
    ledger.execute(&take).unwrap();

    assert_eq!(ledger.balance(&vault_address), 0);
    assert!(ledger.balance(&taker.address()) >= taker_start + 1_000_000_000 - FEE_TOLERANCE);
}
