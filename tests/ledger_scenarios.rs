//! End-to-end ledger scenarios: registry, elections and block integrity

use citizenchain::blockchain::Chain;
use citizenchain::citizen::CitizenStatus;
use citizenchain::election::ElectionStatus;
use citizenchain::error::ChainError;
use citizenchain::policy::{AdminAllowList, Permission, GENESIS_ADMIN};
use citizenchain::transaction::{TxData, SYSTEM_IDENTITY};
use std::sync::Arc;
use std::thread;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Registers and approves `key`, returning its citizen id.
fn approved(chain: &Chain, name: &str, key: &str) -> Result<String, ChainError> {
    chain.add_citizen_registration(name, "1990-01-01", key)?;
    let id = chain
        .get_citizen(key)
        .map(|c| c.id)
        .ok_or_else(|| ChainError::NotFound(key.to_string()))?;
    chain.approve_citizen(&id, GENESIS_ADMIN)?;
    Ok(id)
}

#[test]
fn test_full_election_lifecycle() -> TestResult {
    let chain = Chain::default();

    approved(&chain, "Abebe", "pk-abebe")?;
    approved(&chain, "Almaz", "pk-almaz")?;
    for i in 0..3 {
        approved(&chain, &format!("Voter {}", i), &format!("pk-voter-{}", i))?;
    }
    chain.cut_block()?;

    chain.start_election("Parliament", 30)?;
    chain.register_candidate("Abebe", "pk-abebe", "Schools")?;
    chain.register_candidate("Almaz", "pk-almaz", "Roads")?;
    let candidates = chain.current_candidates();
    let (abebe, almaz) = (candidates[0].id.clone(), candidates[1].id.clone());

    chain.cast_vote("pk-voter-0", &almaz)?;
    chain.cast_vote("pk-voter-1", &almaz)?;
    chain.cast_vote("pk-voter-2", &abebe)?;
    chain.cast_vote("pk-abebe", &abebe)?;
    chain.cast_vote("pk-almaz", &almaz)?;

    let end = chain.end_election()?;
    chain.cut_block()?;

    let history = chain.past_elections();
    assert_eq!(history.len(), 1);
    let finished = &history[0];
    assert_eq!(finished.status, ElectionStatus::Completed);
    assert_eq!(finished.winner.as_ref().map(|w| w.id.as_str()), Some(almaz.as_str()));
    assert_eq!(finished.candidates[0].vote_count, 2);
    assert_eq!(finished.candidates[1].vote_count, 3);
    assert!(matches!(end.data, Some(TxData::ElectionEnd { .. })));

    assert!(chain.current_election().is_none());
    assert_eq!(chain.height(), 3);
    assert!(chain.validate());

    // registrations + approvals for 5 citizens
    assert_eq!(chain.blocks()[1].transactions.len(), 10);
    // start + 2 candidates + 5 votes + end
    assert_eq!(chain.blocks()[2].transactions.len(), 9);
    Ok(())
}

#[test]
fn test_tie_goes_to_first_registered() -> TestResult {
    let chain = Chain::default();
    let keys: Vec<String> = (0..3).map(|i| format!("pk-c{}", i)).collect();
    for key in &keys {
        approved(&chain, key, key)?;
    }

    chain.start_election("Tie", 7)?;
    for key in &keys {
        chain.register_candidate(key, key, "")?;
    }
    let ids: Vec<String> = chain.current_candidates().into_iter().map(|c| c.id).collect();

    // 3, 5 and 5 votes
    let mut voter = 0;
    for (candidate, votes) in ids.iter().zip([3, 5, 5]) {
        for _ in 0..votes {
            let key = format!("pk-v{}", voter);
            approved(&chain, &key, &key)?;
            chain.cast_vote(&key, candidate)?;
            voter += 1;
        }
    }

    chain.end_election()?;
    let winner = chain.past_elections()[0].winner.clone();
    assert_eq!(winner.map(|w| w.id), Some(ids[1].clone()));
    Ok(())
}

#[test]
fn test_no_votes_means_no_winner() -> TestResult {
    let chain = Chain::default();
    approved(&chain, "Solo", "pk-solo")?;
    chain.start_election("Quiet", 1)?;
    chain.register_candidate("Solo", "pk-solo", "")?;

    let tx = chain.end_election()?;
    assert!(matches!(tx.data, Some(TxData::ElectionEnd { winner: None, .. })));
    assert!(chain.past_elections()[0].winner.is_none());
    Ok(())
}

#[test]
fn test_duplicate_registration_keeps_first_record() -> TestResult {
    let chain = Chain::default();
    chain.add_citizen_registration("First", "1980-05-05", "pk-1")?;
    let before = chain.get_citizen("pk-1");

    let err = chain
        .add_citizen_registration("Second", "1999-09-09", "pk-1")
        .unwrap_err();
    assert!(matches!(err, ChainError::AlreadyRegistered(_)));
    assert_eq!(chain.get_citizen("pk-1"), before);
    Ok(())
}

#[test]
fn test_vote_rules() -> TestResult {
    let chain = Chain::default();
    approved(&chain, "Candidate", "pk-c")?;
    approved(&chain, "Voter", "pk-v")?;
    chain.add_citizen_registration("Pending", "1990-01-01", "pk-pending")?;

    assert_eq!(
        chain.cast_vote("pk-v", "anything").unwrap_err(),
        ChainError::NoActiveElection
    );

    chain.start_election("General", 30)?;
    assert!(matches!(
        chain.register_candidate("Pending", "pk-pending", ""),
        Err(ChainError::NotApprovedCitizen(_))
    ));
    chain.register_candidate("Candidate", "pk-c", "")?;
    assert!(matches!(
        chain.register_candidate("Candidate", "pk-c", "again"),
        Err(ChainError::AlreadyCandidate(_))
    ));
    let candidate = chain.current_candidates()[0].id.clone();

    assert!(matches!(
        chain.cast_vote("pk-pending", &candidate),
        Err(ChainError::NotApprovedCitizen(_))
    ));
    assert!(matches!(
        chain.cast_vote("pk-v", "no-such-candidate"),
        Err(ChainError::InvalidCandidate(_))
    ));

    let pooled = chain.pool_size();
    chain.cast_vote("pk-v", &candidate)?;
    assert!(matches!(
        chain.cast_vote("pk-v", &candidate),
        Err(ChainError::AlreadyVoted(_))
    ));
    assert_eq!(chain.pool_size(), pooled + 1);

    assert_eq!(
        chain.start_election("Second", 30).unwrap_err(),
        ChainError::ElectionInProgress
    );
    Ok(())
}

#[test]
fn test_custom_policy_scopes_permissions() -> TestResult {
    let policy = AdminAllowList::new()
        .grant("registrar", Permission::ApproveCitizens)
        .grant("commission", Permission::ManageElections);
    let chain = Chain::new(Arc::new(policy));

    chain.add_citizen_registration("Abebe", "1990-01-01", "pk-1")?;
    let id = chain.get_citizen("pk-1").map(|c| c.id).unwrap_or_default();

    assert!(matches!(
        chain.approve_citizen(&id, "commission"),
        Err(ChainError::NotAuthorized(_))
    ));
    let tx = chain.approve_citizen(&id, "registrar")?;
    assert_eq!(tx.from, SYSTEM_IDENTITY);
    assert_eq!(
        chain.get_citizen("pk-1").map(|c| c.status),
        Some(CitizenStatus::Approved)
    );

    chain.start_election("General", 30)?;
    assert!(matches!(
        chain.cancel_election("registrar"),
        Err(ChainError::NotAuthorized(_))
    ));
    chain.cancel_election("commission")?;
    assert_eq!(chain.past_elections()[0].status, ElectionStatus::Cancelled);
    Ok(())
}

#[test]
fn test_pooled_transactions_move_into_blocks_in_order() -> TestResult {
    let chain = Chain::default();
    let a = chain.add_transaction("alice", "bob", 1)?;
    let b = chain.add_transaction("bob", "carol", 2)?;
    let c = chain.add_transaction("carol", "alice", 3)?;

    let block = chain.cut_block()?;
    let ids: Vec<&str> = block.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![a.id.as_str(), b.id.as_str(), c.id.as_str()]);
    assert!(chain.pending_transactions().is_empty());
    assert_eq!(chain.find_transaction(&b.id), Some(b));
    Ok(())
}

#[test]
fn test_concurrent_operations_keep_chain_valid() -> TestResult {
    let chain = Arc::new(Chain::default());
    let mut handles = Vec::new();

    for worker in 0..8 {
        let chain = chain.clone();
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let key = format!("pk-{}-{}", worker, i);
                chain
                    .add_citizen_registration("Citizen", "1990-01-01", &key)
                    .expect("registration");
                chain.add_transaction(&key, "treasury", 1).expect("transfer");
                if i % 5 == 0 {
                    chain.cut_block().expect("cut");
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker panicked");
    }
    chain.cut_block()?;

    assert!(chain.validate());
    assert_eq!(chain.all_citizens().len(), 200);
    assert_eq!(chain.pool_size(), 0);

    let confirmed: usize = chain.blocks().iter().map(|b| b.transactions.len()).sum();
    assert_eq!(confirmed, 400);
    Ok(())
}
