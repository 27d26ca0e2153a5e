use hedgehog_core::{
    AmbiguousPose, FieldMap, FusionTuning, Localizer, LocalizerState, RawDetection,
    RigidTransform, Rotation, SingleMarkerFallback, Strategy, Translation,
};

/// Detection of marker `id` whose two solutions put the robot at `a` and `b`.
fn detection_placing_robot_at(field: &FieldMap, id: u32, a: Translation, b: Translation) -> RawDetection {
    let marker = field.get(id).unwrap().pose;
    let solution = |robot: Translation| {
        RigidTransform::from_translation(robot)
            .inverse()
            .transform_by(marker)
    };
    RawDetection::new(id, AmbiguousPose::new(solution(a), solution(b)))
}

#[test]
fn single_marker_without_prior_uses_sign_of_y_rule() {
    // Marker 1 sits at (42.19 in, 610.77 in, 18.22 in) facing down the field.
    let field = FieldMap::default();
    let m1 = field.get(1).unwrap().pose.translation;
    assert!(m1.distance(Translation::new(1.0713, 15.513, 0.4628)) < 1e-3);

    let near = Translation::new(1.0, 0.5, 0.0);
    let far = Translation::new(1.0, 14.5, 0.0);
    let detections = [detection_placing_robot_at(&field, 1, near, far)];

    let localizer = Localizer::new(field, FusionTuning::default());
    let (report, next) =
        localizer.process_frame(&detections, &LocalizerState::default(), None);

    // Neither candidate has a negative y, so the primary is kept.
    assert_eq!(report.resolution.strategy, Strategy::Fallback);
    assert!(report.estimate.pose.translation.distance(near) < 1e-9);
    assert_eq!(report.estimate.dispersion.scalar(), 1.0);
    assert!(next.last_known.unwrap().translation.distance(near) < 1e-9);
}

#[test]
fn single_marker_fallback_can_be_overridden() {
    let field = FieldMap::default();
    let near = Translation::new(1.0, 0.5, 0.0);
    let far = Translation::new(1.0, 14.5, 0.0);
    let detections = [detection_placing_robot_at(&field, 1, near, far)];

    let tuning = FusionTuning {
        fallback: SingleMarkerFallback::Secondary,
        ..FusionTuning::default()
    };
    let localizer = Localizer::new(field, tuning);
    let (pose, _) = localizer.process(&detections, &LocalizerState::default(), None);
    assert!(pose.pose.translation.distance(far) < 1e-9);
}

#[test]
fn prior_carries_across_frames() {
    let field = FieldMap::default();
    let truth = Translation::new(4.0, 8.0, 0.0);
    let localizer = Localizer::new(field.clone(), FusionTuning::default());

    // Frame 1: two markers agree on the truth.
    let frame1 = [
        detection_placing_robot_at(&field, 2, truth, Translation::new(1.0, 2.0, 0.0)),
        detection_placing_robot_at(&field, 7, Translation::new(7.0, 3.0, 0.0), truth),
    ];
    let (pose1, state) = localizer.process(&frame1, &LocalizerState::default(), None);
    assert!(pose1.pose.translation.distance(truth) < 1e-9);

    // Frame 2: nothing seen.
    let (pose2, state) = localizer.process(&[], &state, None);
    assert!(!pose2.has_estimate());
    assert_eq!(state.frames_since_update, 1);

    // Frame 3: a lone marker whose primary is the mirror; the prior wins.
    let frame3 = [detection_placing_robot_at(
        &field,
        5,
        Translation::new(7.5, 1.0, 0.0),
        Translation::new(4.1, 8.1, 0.0),
    )];
    let (pose3, state) = localizer.process(&frame3, &state, None);
    assert!(pose3.pose.translation.distance(Translation::new(4.1, 8.1, 0.0)) < 1e-9);
    assert_eq!(state.frames_since_update, 0);
}

#[test]
fn anchor_order_does_not_matter() {
    let field = FieldMap::default();
    let truth = Translation::new(2.0, 5.0, 0.0);
    let localizer = Localizer::new(field.clone(), FusionTuning::default());
    let a = detection_placing_robot_at(&field, 3, truth, Translation::new(6.0, 1.0, 0.0));
    let b = detection_placing_robot_at(&field, 8, Translation::new(0.5, 12.0, 0.0), truth);
    let c = detection_placing_robot_at(&field, 4, truth, Translation::new(7.0, 9.0, 0.0));

    for frame in [[a, b, c], [c, b, a], [b, a, c], [b, c, a]] {
        let (pose, _) = localizer.process(&frame, &LocalizerState::default(), None);
        assert!(
            pose.pose.translation.distance(truth) < 1e-9,
            "got {:?}",
            pose.pose.translation
        );
    }
}

#[test]
fn orientation_survives_averaging() {
    let field = FieldMap::default();
    let robot = RigidTransform::new(Translation::new(3.0, 3.0, 0.0), Rotation::from_yaw_degrees(-120.0));
    let localizer = Localizer::new(field.clone(), FusionTuning::default());
    let frame: Vec<RawDetection> = [5, 6, 7]
        .iter()
        .map(|&id| {
            let marker = field.get(id).unwrap().pose;
            let truth = robot.inverse().transform_by(marker);
            let decoy = RigidTransform::from_translation(Translation::new(id as f64, 12.0, 0.0))
                .inverse()
                .transform_by(marker);
            RawDetection::new(id, AmbiguousPose::new(decoy, truth))
        })
        .collect();
    let (pose, _) = localizer.process(&frame, &LocalizerState::default(), None);
    assert!(pose.pose.approx_eq(robot, 1e-9));
    assert!((pose.pose.rotation.yaw_degrees() + 120.0).abs() < 1e-6);
}

#[test]
fn quaternion_sign_of_a_solution_does_not_matter() {
    let field = FieldMap::default();
    let robot = RigidTransform::new(Translation::new(3.0, 10.0, 0.0), Rotation::from_yaw_degrees(80.0));
    let decoy = RigidTransform::new(Translation::new(7.0, 2.0, 0.0), Rotation::from_yaw_degrees(80.0));
    let seen = |id: u32| {
        let marker = field.get(id).unwrap().pose;
        AmbiguousPose::new(
            robot.inverse().transform_by(marker),
            decoy.inverse().transform_by(marker),
        )
    };

    // The detector may hand back either sign of the same rotation.
    let mut flipped = seen(2);
    flipped.primary.rotation = flipped.primary.rotation * -1.0;
    let detections = [RawDetection::new(1, seen(1)), RawDetection::new(2, flipped)];

    let localizer = Localizer::new(field.clone(), FusionTuning::default());
    let (pose, _) = localizer.process(&detections, &LocalizerState::default(), None);
    assert_eq!(pose.marker_ids, vec![1, 2]);
    assert!(pose.pose.translation.distance(robot.translation) < 1e-9);
    assert!((pose.pose.rotation.yaw_degrees() - 80.0).abs() < 1e-6);
    assert!((pose.pose.rotation.dot(pose.pose.rotation) - 1.0).abs() < 1e-9);
}
