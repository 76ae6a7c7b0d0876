//! Turns a raw comparison result into persisted match records.
//!
//! Both identifiers of a raw match must resolve to submissions of the
//! owning job; a match that doesn't fully resolve is dropped. This is a
//! data-integrity guard — a match record must never point at a submission
//! outside its own job.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::job::{JobId, MatchRecord, ResultRecord, Submission};
use crate::service::types::ComparisonResult;

pub fn materialize(
    job_id: JobId,
    result: &ComparisonResult,
    submissions: &[Submission],
) -> (ResultRecord, Vec<MatchRecord>) {
    let by_service_id: HashMap<&str, _> = submissions
        .iter()
        .filter(|s| s.job_id == job_id)
        .map(|s| (s.submission_id.as_str(), s.id))
        .collect();

    let record = ResultRecord {
        id: Uuid::new_v4(),
        job_id,
        url: result.url.clone(),
    };

    let mut matches = Vec::with_capacity(result.matches.len());
    for raw in &result.matches {
        let (Some(first), Some(second)) = (
            by_service_id.get(raw.first.as_str()),
            by_service_id.get(raw.second.as_str()),
        ) else {
            debug!(
                "dropping match {:?} / {:?}: not resolvable within job {job_id}",
                raw.first, raw.second
            );
            continue;
        };
        matches.push(MatchRecord {
            result_id: record.id,
            first_submission: *first,
            second_submission: *second,
            first_percentage: raw.first_percentage,
            second_percentage: raw.second_percentage,
            lines_matched: raw.lines_matched,
            line_matches: raw.line_matches.clone(),
        });
    }

    (record, matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Job, SubmissionKind};
    use crate::service::types::{LineMatch, RawMatch, SessionUrl};

    fn raw(first: &str, second: &str) -> RawMatch {
        RawMatch {
            first: first.into(),
            second: second.into(),
            first_percentage: 55.0,
            second_percentage: 60.0,
            lines_matched: 12,
            line_matches: vec![LineMatch {
                first: (1, 12),
                second: (3, 14),
            }],
        }
    }

    fn result_of(matches: Vec<RawMatch>) -> ComparisonResult {
        ComparisonResult {
            url: SessionUrl::parse("http://compare.example/results/1/0").unwrap(),
            matches,
        }
    }

    #[test]
    fn resolving_match_becomes_a_record() {
        let job = Job::new("python");
        let alice = Submission::new(job.id, "alice.py", SubmissionKind::Files);
        let bob = Submission::new(job.id, "bob.py", SubmissionKind::Files);
        let subs = vec![alice.clone(), bob.clone()];

        let (record, matches) =
            materialize(job.id, &result_of(vec![raw("alice.py", "bob.py")]), &subs);

        assert_eq!(record.job_id, job.id);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].result_id, record.id);
        assert_eq!(matches[0].first_submission, alice.id);
        assert_eq!(matches[0].second_submission, bob.id);
        assert_eq!(matches[0].lines_matched, 12);
    }

    #[test]
    fn unresolvable_identifier_drops_the_match() {
        let job = Job::new("python");
        let alice = Submission::new(job.id, "alice.py", SubmissionKind::Files);
        let subs = vec![alice];

        let (_, matches) = materialize(
            job.id,
            &result_of(vec![raw("alice.py", "stranger.py")]),
            &subs,
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn submissions_of_other_jobs_never_resolve() {
        let job = Job::new("python");
        let other = Job::new("python");
        let alice = Submission::new(job.id, "alice.py", SubmissionKind::Files);
        let bob_elsewhere = Submission::new(other.id, "bob.py", SubmissionKind::Files);
        let subs = vec![alice, bob_elsewhere];

        let (_, matches) =
            materialize(job.id, &result_of(vec![raw("alice.py", "bob.py")]), &subs);
        assert!(matches.is_empty());
    }

    #[test]
    fn partial_drops_keep_the_resolvable_matches() {
        let job = Job::new("python");
        let alice = Submission::new(job.id, "alice.py", SubmissionKind::Files);
        let bob = Submission::new(job.id, "bob.py", SubmissionKind::Files);
        let subs = vec![alice, bob];

        let (_, matches) = materialize(
            job.id,
            &result_of(vec![
                raw("alice.py", "bob.py"),
                raw("alice.py", "ghost.py"),
            ]),
            &subs,
        );
        assert_eq!(matches.len(), 1);
    }
}
